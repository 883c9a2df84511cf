//! Stock ledger: receipts, inspections, consumption and reconciliation
//!
//! Every movement locks the ingredient's `stock_levels` row (creating it on
//! first use), computes the new total with [`apply_movement`] and writes it
//! back inside the caller's transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    apply_movement, calendar, is_low_stock, validate_non_negative, validate_positive,
    AppliedMovement, ReconciliationFigures, StockMovement, Unit,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Current stock of one ingredient
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockLevel {
    pub ingredient_id: Uuid,
    pub ingredient_code: String,
    pub ingredient_name: String,
    pub unit: Unit,
    pub total_amount: Decimal,
    pub warning_amount: Decimal,
    #[serde(with = "calendar::jalali_option")]
    pub last_received_date: Option<NaiveDate>,
    pub updated_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub is_low_stock: bool,
}

impl StockLevel {
    fn flag_low_stock(mut self) -> Self {
        self.is_low_stock = is_low_stock(self.total_amount, self.warning_amount);
        self
    }
}

/// Stock receipt log entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockReceipt {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub amount: Decimal,
    pub unit: Unit,
    pub delivery_code: Option<String>,
    #[serde(with = "calendar::jalali")]
    pub received_date: NaiveDate,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for recording goods received
#[derive(Debug, Deserialize, Validate)]
pub struct RecordReceiptInput {
    pub ingredient_id: Uuid,
    pub amount: Decimal,
    #[validate(length(max = 100, message = "Delivery code must be at most 100 characters"))]
    pub delivery_code: Option<String>,
    #[serde(with = "calendar::jalali")]
    pub received_date: NaiveDate,
}

/// Physical stock count
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockInspection {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub actual_amount: Decimal,
    #[serde(with = "calendar::jalali")]
    pub inspection_date: NaiveDate,
    pub inspector_id: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a stock inspection
#[derive(Debug, Deserialize, Validate)]
pub struct RecordInspectionInput {
    pub ingredient_id: Uuid,
    pub actual_amount: Decimal,
    #[serde(with = "calendar::jalali")]
    pub inspection_date: NaiveDate,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Stock level with its movement history
#[derive(Debug, Clone, Serialize)]
pub struct IngredientStock {
    #[serde(flatten)]
    pub level: StockLevel,
    pub receipts: Vec<StockReceipt>,
    pub inspections: Vec<StockInspection>,
}

/// Query for a reconciliation read
#[derive(Debug, Deserialize)]
pub struct ReconciliationQuery {
    #[serde(with = "calendar::jalali")]
    pub as_of: NaiveDate,
    #[serde(default, with = "calendar::jalali_option")]
    pub reference_date: Option<NaiveDate>,
}

/// Predicted vs. posted consumption vs. inspected stock for one ingredient
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: Unit,
    #[serde(with = "calendar::jalali")]
    pub as_of: NaiveDate,
    #[serde(with = "calendar::jalali_option")]
    pub current_inspection_date: Option<NaiveDate>,
    #[serde(with = "calendar::jalali_option")]
    pub previous_inspection_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub figures: ReconciliationFigures,
}

#[derive(Debug, FromRow)]
struct InspectionPoint {
    inspection_date: NaiveDate,
    actual_amount: Decimal,
}

/// Lock an ingredient's stock row, creating it at zero on first use
///
/// Returns the total before any change.
pub async fn lock_level(conn: &mut PgConnection, ingredient_id: Uuid) -> AppResult<Decimal> {
    sqlx::query(
        "INSERT INTO stock_levels (ingredient_id) VALUES ($1) ON CONFLICT (ingredient_id) DO NOTHING",
    )
    .bind(ingredient_id)
    .execute(&mut *conn)
    .await?;

    let total = sqlx::query_scalar::<_, Decimal>(
        "SELECT total_amount FROM stock_levels WHERE ingredient_id = $1 FOR UPDATE",
    )
    .bind(ingredient_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Apply a movement to an ingredient's stock under its row lock
///
/// `on_date` moves `last_received_date`: a receipt keeps the later of the two
/// dates, an inspection overwrites it and consumption leaves it alone.
pub async fn apply_to_level(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
    movement: StockMovement,
    on_date: Option<NaiveDate>,
) -> AppResult<(Decimal, AppliedMovement)> {
    let before = lock_level(conn, ingredient_id).await?;
    let applied = apply_movement(before, movement);

    let sql = match movement {
        // GREATEST ignores NULL, so the first receipt sets the date
        StockMovement::Receipt(_) => {
            r#"
            UPDATE stock_levels
            SET total_amount = $2, last_received_date = GREATEST(last_received_date, $3::DATE),
                updated_at = NOW()
            WHERE ingredient_id = $1
            "#
        }
        StockMovement::Inspection(_) => {
            r#"
            UPDATE stock_levels
            SET total_amount = $2, last_received_date = COALESCE($3::DATE, last_received_date),
                updated_at = NOW()
            WHERE ingredient_id = $1
            "#
        }
        StockMovement::Consumption(_) => {
            "UPDATE stock_levels SET total_amount = $2, updated_at = NOW() WHERE ingredient_id = $1"
        }
    };

    let mut query = sqlx::query(sql).bind(ingredient_id).bind(applied.total);
    if !matches!(movement, StockMovement::Consumption(_)) {
        query = query.bind(on_date);
    }
    query.execute(&mut *conn).await?;

    Ok((before, applied))
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record goods received and add them to stock
    pub async fn record_receipt(
        &self,
        user_id: Uuid,
        input: RecordReceiptInput,
    ) -> AppResult<StockReceipt> {
        input.validate()?;
        validate_positive("amount", input.amount)?;

        let mut tx = self.db.begin().await?;

        let unit = ingredient_unit(&mut tx, input.ingredient_id).await?;

        let receipt = sqlx::query_as::<_, StockReceipt>(
            r#"
            INSERT INTO stock_receipts (ingredient_id, amount, unit, delivery_code, received_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, ingredient_id, amount, unit, delivery_code, received_date, created_by, created_at
            "#,
        )
        .bind(input.ingredient_id)
        .bind(input.amount)
        .bind(unit)
        .bind(&input.delivery_code)
        .bind(input.received_date)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let (before, applied) = apply_to_level(
            &mut tx,
            input.ingredient_id,
            StockMovement::Receipt(input.amount),
            Some(input.received_date),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            ingredient_id = %input.ingredient_id,
            amount = %input.amount,
            before = %before,
            after = %applied.total,
            "Stock receipt recorded"
        );
        Ok(receipt)
    }

    /// Record a physical count; it replaces the running total
    pub async fn record_inspection(
        &self,
        user_id: Uuid,
        input: RecordInspectionInput,
    ) -> AppResult<StockInspection> {
        input.validate()?;
        validate_non_negative("actual_amount", input.actual_amount)?;

        let mut tx = self.db.begin().await?;

        ingredient_unit(&mut tx, input.ingredient_id).await?;

        let inspection = sqlx::query_as::<_, StockInspection>(
            r#"
            INSERT INTO stock_inspections (ingredient_id, actual_amount, inspection_date, inspector_id, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, ingredient_id, actual_amount, inspection_date, inspector_id, notes, created_at
            "#,
        )
        .bind(input.ingredient_id)
        .bind(input.actual_amount)
        .bind(input.inspection_date)
        .bind(user_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::DuplicateEntry(_) => {
                AppError::DuplicateEntry("inspection for this ingredient and date".to_string())
            }
            other => other,
        })?;

        let (before, applied) = apply_to_level(
            &mut tx,
            input.ingredient_id,
            StockMovement::Inspection(input.actual_amount),
            Some(input.inspection_date),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            ingredient_id = %input.ingredient_id,
            before = %before,
            after = %applied.total,
            "Stock inspection recorded"
        );
        Ok(inspection)
    }

    /// Every ingredient's stock, with the low-stock flag
    pub async fn list_levels(&self, low_only: bool) -> AppResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT i.id AS ingredient_id, i.code AS ingredient_code, i.name AS ingredient_name, i.unit,
                   COALESCE(s.total_amount, 0) AS total_amount, i.warning_amount,
                   s.last_received_date, s.updated_at
            FROM ingredients i
            LEFT JOIN stock_levels s ON s.ingredient_id = i.id
            ORDER BY i.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(levels
            .into_iter()
            .map(StockLevel::flag_low_stock)
            .filter(|level| !low_only || level.is_low_stock)
            .collect())
    }

    /// One ingredient's stock with its receipt and inspection history
    pub async fn get_ingredient_stock(&self, ingredient_id: Uuid) -> AppResult<IngredientStock> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT i.id AS ingredient_id, i.code AS ingredient_code, i.name AS ingredient_name, i.unit,
                   COALESCE(s.total_amount, 0) AS total_amount, i.warning_amount,
                   s.last_received_date, s.updated_at
            FROM ingredients i
            LEFT JOIN stock_levels s ON s.ingredient_id = i.id
            WHERE i.id = $1
            "#,
        )
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?
        .flag_low_stock();

        let receipts = sqlx::query_as::<_, StockReceipt>(
            r#"
            SELECT id, ingredient_id, amount, unit, delivery_code, received_date, created_by, created_at
            FROM stock_receipts
            WHERE ingredient_id = $1
            ORDER BY received_date DESC, created_at DESC
            "#,
        )
        .bind(ingredient_id)
        .fetch_all(&self.db)
        .await?;

        let inspections = sqlx::query_as::<_, StockInspection>(
            r#"
            SELECT id, ingredient_id, actual_amount, inspection_date, inspector_id, notes, created_at
            FROM stock_inspections
            WHERE ingredient_id = $1
            ORDER BY inspection_date DESC
            "#,
        )
        .bind(ingredient_id)
        .fetch_all(&self.db)
        .await?;

        Ok(IngredientStock {
            level,
            receipts,
            inspections,
        })
    }

    /// Compare predicted consumption, posted consumption and inspected stock
    ///
    /// Read-only. Without a reference date, the previous inspection is the
    /// latest one strictly before the current one.
    pub async fn reconciliation(
        &self,
        ingredient_id: Uuid,
        query: ReconciliationQuery,
    ) -> AppResult<ReconciliationReport> {
        let (ingredient_name, unit) = sqlx::query_as::<_, (String, Unit)>(
            "SELECT name, unit FROM ingredients WHERE id = $1",
        )
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        let predicted = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(fi.amount_per_serving::NUMERIC * mp.capacity), 0)
            FROM menu_plans mp
            JOIN food_ingredients fi ON fi.food_id = mp.food_id
            WHERE fi.ingredient_id = $1 AND mp.plan_date <= $2
            "#,
        )
        .bind(ingredient_id)
        .bind(query.as_of)
        .fetch_one(&self.db)
        .await?;

        let actual = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(cr.consumed_amount), 0)
            FROM consumption_records cr
            JOIN menu_plans mp ON mp.id = cr.menu_plan_id
            WHERE cr.ingredient_id = $1 AND mp.plan_date <= $2
            "#,
        )
        .bind(ingredient_id)
        .bind(query.as_of)
        .fetch_one(&self.db)
        .await?;

        let current = self.latest_inspection(ingredient_id, query.as_of, false).await?;

        let previous = match (query.reference_date, &current) {
            (Some(reference), _) => self.latest_inspection(ingredient_id, reference, false).await?,
            (None, Some(current)) => {
                self.latest_inspection(ingredient_id, current.inspection_date, true)
                    .await?
            }
            (None, None) => None,
        };

        Ok(ReconciliationReport {
            ingredient_id,
            ingredient_name,
            unit,
            as_of: query.as_of,
            current_inspection_date: current.as_ref().map(|p| p.inspection_date),
            previous_inspection_date: previous.as_ref().map(|p| p.inspection_date),
            figures: ReconciliationFigures::new(
                predicted,
                actual,
                current.map(|p| p.actual_amount),
                previous.map(|p| p.actual_amount),
            ),
        })
    }

    /// Latest inspection on or before `date` (strictly before when `exclusive`)
    async fn latest_inspection(
        &self,
        ingredient_id: Uuid,
        date: NaiveDate,
        exclusive: bool,
    ) -> AppResult<Option<InspectionPoint>> {
        let point = sqlx::query_as::<_, InspectionPoint>(
            r#"
            SELECT inspection_date, actual_amount
            FROM stock_inspections
            WHERE ingredient_id = $1
              AND (inspection_date < $2 OR (NOT $3 AND inspection_date = $2))
            ORDER BY inspection_date DESC
            LIMIT 1
            "#,
        )
        .bind(ingredient_id)
        .bind(date)
        .bind(exclusive)
        .fetch_optional(&self.db)
        .await?;

        Ok(point)
    }
}

async fn ingredient_unit(conn: &mut PgConnection, ingredient_id: Uuid) -> AppResult<Unit> {
    sqlx::query_scalar::<_, Unit>("SELECT unit FROM ingredients WHERE id = $1")
        .bind(ingredient_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
}
