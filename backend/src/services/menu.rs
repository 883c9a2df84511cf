//! Menu planning service: plans, cook status and the consumption trigger

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{calendar, CookStatus, MealSlot, StatusTransition};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::consumption::{ConsumptionPoster, PostingOutcome};
use crate::services::unit_of_work::{DeferredEffect, UnitOfWork};

#[derive(Clone)]
pub struct MenuService {
    db: PgPool,
}

/// Menu plan with its food and dessert titles
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MenuPlan {
    pub id: Uuid,
    #[serde(with = "calendar::jalali")]
    pub plan_date: NaiveDate,
    pub food_id: Uuid,
    pub food_title: String,
    pub meal_slot: MealSlot,
    pub capacity: i32,
    pub dessert_id: Option<Uuid>,
    pub dessert_title: Option<String>,
    pub dessert_count: i32,
    pub cook_status: CookStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a menu plan
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuPlanInput {
    #[serde(with = "calendar::jalali")]
    pub plan_date: NaiveDate,
    pub food_id: Uuid,
    pub meal_slot: MealSlot,
    #[validate(range(min = 0, message = "Capacity must not be negative"))]
    pub capacity: i32,
    pub dessert_id: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Dessert count must not be negative"))]
    pub dessert_count: i32,
}

/// Filters for listing plans
#[derive(Debug, Default, Deserialize)]
pub struct MenuPlanFilter {
    #[serde(default, with = "calendar::jalali_option")]
    pub date: Option<NaiveDate>,
    pub meal_slot: Option<MealSlot>,
    pub cook_status: Option<CookStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCookStatusInput {
    pub cook_status: CookStatus,
}

/// Result of a cook-status update
#[derive(Debug, Clone, Serialize)]
pub struct CookStatusOutcome {
    pub plan: MenuPlan,
    pub previous_status: CookStatus,
    pub changed: bool,
    /// Present when this update moved the plan into `done`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption: Option<PostingOutcome>,
}

const PLAN_SELECT: &str = r#"
    SELECT mp.id, mp.plan_date, mp.food_id, f.title AS food_title, mp.meal_slot, mp.capacity,
           mp.dessert_id, d.title AS dessert_title, mp.dessert_count, mp.cook_status,
           mp.created_by, mp.created_at, mp.updated_at
    FROM menu_plans mp
    JOIN foods f ON f.id = mp.food_id
    LEFT JOIN desserts d ON d.id = mp.dessert_id
"#;

impl MenuService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a menu plan in `pending` status
    pub async fn create_plan(&self, user_id: Uuid, input: CreateMenuPlanInput) -> AppResult<MenuPlan> {
        input.validate()?;

        let food = CatalogService::new(self.db.clone()).get_food(input.food_id).await?;
        if !food.meal_slots.contains(&input.meal_slot) {
            return Err(AppError::validation(
                "meal_slot",
                format!("{} is not offered for {}", food.title, input.meal_slot),
            ));
        }

        if input.dessert_id.is_none() && input.dessert_count > 0 {
            return Err(AppError::validation(
                "dessert_count",
                "Dessert count requires a dessert",
            ));
        }
        if let Some(dessert_id) = input.dessert_id {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM desserts WHERE id = $1)")
                .bind(dessert_id)
                .fetch_one(&self.db)
                .await?;
            if !exists {
                return Err(AppError::NotFound("Dessert".to_string()));
            }
        }

        let plan_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO menu_plans (plan_date, food_id, meal_slot, capacity, dessert_id, dessert_count, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.plan_date)
        .bind(input.food_id)
        .bind(input.meal_slot)
        .bind(input.capacity)
        .bind(input.dessert_id)
        .bind(input.dessert_count)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::DuplicateEntry(_) => {
                AppError::DuplicateEntry("menu plan for this food, date and meal slot".to_string())
            }
            other => other,
        })?;

        tracing::info!(
            plan_id = %plan_id,
            food_id = %input.food_id,
            date = %input.plan_date,
            meal_slot = %input.meal_slot,
            capacity = input.capacity,
            "Menu plan created"
        );

        self.get_plan(plan_id).await
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<MenuPlan> {
        sqlx::query_as::<_, MenuPlan>(&format!("{} WHERE mp.id = $1", PLAN_SELECT))
            .bind(plan_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Menu plan".to_string()))
    }

    /// List plans ordered by date and meal slot
    pub async fn list_plans(&self, filter: MenuPlanFilter) -> AppResult<Vec<MenuPlan>> {
        let plans = sqlx::query_as::<_, MenuPlan>(&format!(
            r#"
            {}
            WHERE ($1::DATE IS NULL OR mp.plan_date = $1)
              AND ($2::VARCHAR IS NULL OR mp.meal_slot = $2)
              AND ($3::VARCHAR IS NULL OR mp.cook_status = $3)
            ORDER BY mp.plan_date DESC,
                     CASE mp.meal_slot WHEN 'breakfast' THEN 1 WHEN 'lunch' THEN 2 ELSE 3 END,
                     f.title
            "#,
            PLAN_SELECT
        ))
        .bind(filter.date)
        .bind(filter.meal_slot)
        .bind(filter.cook_status)
        .fetch_all(&self.db)
        .await?;

        Ok(plans)
    }

    /// Move a plan's cook status forward
    ///
    /// The prior status and capacity are read under the row lock. A move into
    /// `done` queues consumption posting at that capacity, which runs only
    /// after the status change commits.
    pub async fn update_cook_status(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        next: CookStatus,
    ) -> AppResult<CookStatusOutcome> {
        let mut uow = UnitOfWork::begin(&self.db).await?;

        let (current, capacity) = sqlx::query_as::<_, (CookStatus, i32)>(
            "SELECT cook_status, capacity FROM menu_plans WHERE id = $1 FOR UPDATE",
        )
        .bind(plan_id)
        .fetch_optional(uow.conn())
        .await?
        .ok_or_else(|| AppError::NotFound("Menu plan".to_string()))?;

        let transition = current.transition(next)?;

        if let StatusTransition::Advanced { from, to } = transition {
            sqlx::query("UPDATE menu_plans SET cook_status = $2, updated_at = NOW() WHERE id = $1")
                .bind(plan_id)
                .bind(to)
                .execute(uow.conn())
                .await?;

            tracing::info!(plan_id = %plan_id, from = %from, to = %to, "Cook status changed");
        }

        if transition.enters_done() {
            uow.defer(DeferredEffect::PostConsumption { plan_id, capacity });
        }

        let effects = uow.commit().await?;

        let mut consumption = None;
        for effect in effects {
            match effect {
                DeferredEffect::PostConsumption { plan_id, capacity } => {
                    consumption = Some(self.run_posting(plan_id, user_id, capacity).await);
                }
            }
        }

        Ok(CookStatusOutcome {
            plan: self.get_plan(plan_id).await?,
            previous_status: current,
            changed: !matches!(transition, StatusTransition::Unchanged(_)),
            consumption,
        })
    }

    /// Post (or re-try posting) consumption for a cooked plan at its current capacity
    pub async fn post_consumption(&self, plan_id: Uuid, user_id: Uuid) -> AppResult<PostingOutcome> {
        ConsumptionPoster::new(self.db.clone())
            .post(plan_id, user_id, None)
            .await
    }

    /// A posting failure must not undo the committed status change
    async fn run_posting(&self, plan_id: Uuid, user_id: Uuid, capacity: i32) -> PostingOutcome {
        let poster = ConsumptionPoster::new(self.db.clone());
        match poster.post(plan_id, user_id, Some(capacity)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(plan_id = %plan_id, "Consumption posting failed: {}", e);
                PostingOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
