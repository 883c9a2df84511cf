//! Bill-of-materials resolver: which ingredients, and how much, one serving of a food needs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{validate_bom_line, BomRequirement, CategoryPair, Unit};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct BomService {
    db: PgPool,
}

/// A stored BOM line with the ingredient's display fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BomLine {
    pub id: Uuid,
    pub food_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: Unit,
    pub amount_per_serving: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for adding an ingredient to a food
#[derive(Debug, Deserialize, Validate)]
pub struct AddBomLineInput {
    pub ingredient_id: Uuid,
    #[validate(range(min = 0, message = "Amount per serving must not be negative"))]
    pub amount_per_serving: i32,
}

#[derive(Debug, FromRow)]
struct PairRow {
    name: String,
    category: shared::Category,
    subcategory: shared::Subcategory,
}

impl PairRow {
    fn pair(&self) -> AppResult<CategoryPair> {
        CategoryPair::new(self.category, self.subcategory).ok_or_else(|| {
            AppError::Internal(format!(
                "Stored {} has subcategory {} outside {}",
                self.name, self.subcategory, self.category
            ))
        })
    }
}

/// BOM lines for a food, ordered by ingredient name
///
/// Runs on the caller's connection so consumption posting reads the BOM inside
/// its own transaction.
pub async fn lines_for_food(conn: &mut PgConnection, food_id: Uuid) -> AppResult<Vec<BomRequirement>> {
    let lines = sqlx::query_as::<_, BomRequirement>(
        r#"
        SELECT fi.ingredient_id, i.name AS ingredient_name, fi.amount_per_serving, i.unit
        FROM food_ingredients fi
        JOIN ingredients i ON i.id = fi.ingredient_id
        WHERE fi.food_id = $1
        ORDER BY i.name, fi.ingredient_id
        "#,
    )
    .bind(food_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

impl BomService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Resolve the BOM of a food
    pub async fn lines_for_food(&self, food_id: Uuid) -> AppResult<Vec<BomRequirement>> {
        let mut conn = self.db.acquire().await?;
        self.ensure_food(&mut conn, food_id).await?;
        lines_for_food(&mut conn, food_id).await
    }

    /// Add an ingredient to a food's BOM
    ///
    /// The ingredient must carry the food's category and subcategory.
    pub async fn add_line(&self, food_id: Uuid, input: AddBomLineInput) -> AppResult<BomLine> {
        input.validate()?;

        let food = sqlx::query_as::<_, PairRow>(
            "SELECT title AS name, category, subcategory FROM foods WHERE id = $1",
        )
        .bind(food_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Food".to_string()))?;

        let ingredient = sqlx::query_as::<_, PairRow>(
            "SELECT name, category, subcategory FROM ingredients WHERE id = $1",
        )
        .bind(input.ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        validate_bom_line(
            &ingredient.name,
            ingredient.pair()?,
            food.pair()?,
            input.amount_per_serving,
        )?;

        let line = sqlx::query_as::<_, BomLine>(
            r#"
            WITH inserted AS (
                INSERT INTO food_ingredients (food_id, ingredient_id, amount_per_serving)
                VALUES ($1, $2, $3)
                RETURNING id, food_id, ingredient_id, amount_per_serving, created_at
            )
            SELECT ins.id, ins.food_id, ins.ingredient_id, i.name AS ingredient_name, i.unit,
                   ins.amount_per_serving, ins.created_at
            FROM inserted ins
            JOIN ingredients i ON i.id = ins.ingredient_id
            "#,
        )
        .bind(food_id)
        .bind(input.ingredient_id)
        .bind(input.amount_per_serving)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            food_id = %food_id,
            ingredient_id = %line.ingredient_id,
            amount_per_serving = line.amount_per_serving,
            "BOM line added"
        );
        Ok(line)
    }

    async fn ensure_food(&self, conn: &mut PgConnection, food_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM foods WHERE id = $1)")
            .bind(food_id)
            .fetch_one(&mut *conn)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Food".to_string()));
        }
        Ok(())
    }
}
