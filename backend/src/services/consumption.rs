//! Consumption poster: turns a cooked plan into consumption records and stock decrements
//!
//! Runs after the status change that moved the plan into `done` has
//! committed. Posting is idempotent: a plan that already has records is left
//! alone, and the unique (plan, ingredient) index backs that check up.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{plan_consumption, CookStatus, StockClamp, StockMovement, Unit};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{bom, stock};

#[derive(Clone)]
pub struct ConsumptionPoster {
    db: PgPool,
}

/// Consumption record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConsumptionRecord {
    pub id: Uuid,
    pub menu_plan_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub consumed_amount: Decimal,
    pub unit: Unit,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// What a posting run did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PostingOutcome {
    Posted {
        records: usize,
        capacity: i32,
        /// Consumptions that exceeded stock and were floored at zero
        clamps: Vec<StockClamp>,
    },
    /// Records already exist for this plan
    AlreadyPosted,
    /// The plan is no longer `done`
    NotDone,
    /// Posting failed after the status change committed; retry via the consumption endpoint
    Failed { message: String },
}

#[derive(Debug, FromRow)]
struct LockedPlan {
    food_id: Uuid,
    capacity: i32,
    cook_status: CookStatus,
}

impl ConsumptionPoster {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Post consumption for a cooked plan
    ///
    /// Each BOM line posts `amount_per_serving x capacity`. `capacity` is the
    /// value captured when the plan entered `done`; `None` uses the plan's
    /// capacity as it stands now.
    pub async fn post(
        &self,
        plan_id: Uuid,
        posted_by: Uuid,
        capacity: Option<i32>,
    ) -> AppResult<PostingOutcome> {
        let mut tx = self.db.begin().await?;

        let plan = sqlx::query_as::<_, LockedPlan>(
            "SELECT food_id, capacity, cook_status FROM menu_plans WHERE id = $1 FOR UPDATE",
        )
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu plan".to_string()))?;

        if plan.cook_status != CookStatus::Done {
            tracing::debug!(plan_id = %plan_id, status = %plan.cook_status, "Plan not done; nothing to post");
            return Ok(PostingOutcome::NotDone);
        }

        let already_posted = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM consumption_records WHERE menu_plan_id = $1)",
        )
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_posted {
            tracing::debug!(plan_id = %plan_id, "Consumption already posted");
            return Ok(PostingOutcome::AlreadyPosted);
        }

        let capacity = capacity.unwrap_or(plan.capacity);
        let bom = bom::lines_for_food(&mut tx, plan.food_id).await?;
        let lines = plan_consumption(&bom, capacity);

        let mut records = 0;
        let mut clamps = Vec::new();

        for line in lines {
            let inserted = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO consumption_records (menu_plan_id, ingredient_id, consumed_amount, unit, created_by)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (menu_plan_id, ingredient_id) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(plan_id)
            .bind(line.ingredient_id)
            .bind(line.consumed_amount)
            .bind(line.unit)
            .bind(posted_by)
            .fetch_optional(&mut *tx)
            .await?;

            if inserted.is_none() {
                continue;
            }
            records += 1;

            let (before, applied) = stock::apply_to_level(
                &mut tx,
                line.ingredient_id,
                StockMovement::Consumption(line.consumed_amount),
                None,
            )
            .await?;

            if applied.shortfall.is_some() {
                tracing::warn!(
                    plan_id = %plan_id,
                    ingredient_id = %line.ingredient_id,
                    ingredient = %line.ingredient_name,
                    requested = %line.consumed_amount,
                    available = %before,
                    "Consumption exceeds stock; clamped to zero"
                );
                clamps.push(StockClamp {
                    ingredient_id: line.ingredient_id,
                    ingredient: line.ingredient_name,
                    requested: line.consumed_amount,
                    available: before,
                });
            }
        }

        tx.commit().await?;

        tracing::info!(
            plan_id = %plan_id,
            records,
            capacity,
            clamps = clamps.len(),
            "Consumption posted"
        );

        Ok(PostingOutcome::Posted {
            records,
            capacity,
            clamps,
        })
    }

    /// Consumption records for a plan, ordered by ingredient name
    pub async fn records_for_plan(&self, plan_id: Uuid) -> AppResult<Vec<ConsumptionRecord>> {
        let records = sqlx::query_as::<_, ConsumptionRecord>(
            r#"
            SELECT cr.id, cr.menu_plan_id, cr.ingredient_id, i.name AS ingredient_name,
                   cr.consumed_amount, cr.unit, cr.created_by, cr.created_at
            FROM consumption_records cr
            JOIN ingredients i ON i.id = cr.ingredient_id
            WHERE cr.menu_plan_id = $1
            ORDER BY i.name
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}
