//! Catalog service: ingredients, foods and desserts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_category_pair, validate_non_negative, Category, CategoryPair, MealSlot, Subcategory,
    Unit,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Catalog service for reference data used by menu plans and issuance
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Ingredient record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: Category,
    pub subcategory: Subcategory,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub warning_amount: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an ingredient
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIngredientInput {
    #[validate(length(min = 1, max = 50, message = "Code must be 1 to 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,
    pub category: Category,
    pub subcategory: Subcategory,
    pub unit: Unit,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub warning_amount: Decimal,
}

/// Food record
#[derive(Debug, Clone, Serialize)]
pub struct Food {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub subcategory: Subcategory,
    pub meal_slots: Vec<MealSlot>,
    pub preparation_minutes: i32,
    pub unit_price: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Food {
    pub fn category_pair(&self) -> Option<CategoryPair> {
        CategoryPair::new(self.category, self.subcategory)
    }
}

/// Row for food queries; meal slots are stored as a text array
#[derive(Debug, FromRow)]
struct FoodRow {
    id: Uuid,
    title: String,
    category: Category,
    subcategory: Subcategory,
    meal_slots: Vec<String>,
    preparation_minutes: i32,
    unit_price: Decimal,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<FoodRow> for Food {
    type Error = AppError;

    fn try_from(row: FoodRow) -> Result<Self, Self::Error> {
        let meal_slots = row
            .meal_slots
            .iter()
            .map(|s| s.parse::<MealSlot>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Stored food {}: {}", row.id, e)))?;

        Ok(Food {
            id: row.id,
            title: row.title,
            category: row.category,
            subcategory: row.subcategory,
            meal_slots,
            preparation_minutes: row.preparation_minutes,
            unit_price: row.unit_price,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Input for creating a food
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFoodInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub category: Category,
    pub subcategory: Subcategory,
    #[validate(length(min = 1, message = "At least one meal slot is required"))]
    pub meal_slots: Vec<MealSlot>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Preparation time must not be negative"))]
    pub preparation_minutes: i32,
    #[serde(default)]
    pub unit_price: Decimal,
}

/// Dessert record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Dessert {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub unit_price: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a dessert
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDessertInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub unit_price: Decimal,
}

const FOOD_COLUMNS: &str = "id, title, category, subcategory, meal_slots, preparation_minutes, \
                            unit_price, created_by, created_at";

/// Load foods by id on an existing connection, in no particular order
pub async fn foods_by_ids(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<Vec<Food>> {
    let rows = sqlx::query_as::<_, FoodRow>(&format!(
        "SELECT {} FROM foods WHERE id = ANY($1)",
        FOOD_COLUMNS
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Food::try_from).collect()
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an ingredient
    pub async fn create_ingredient(
        &self,
        user_id: Uuid,
        input: CreateIngredientInput,
    ) -> AppResult<Ingredient> {
        input.validate()?;
        validate_category_pair(input.category, input.subcategory)?;
        validate_non_negative("unit_price", input.unit_price)?;
        validate_non_negative("warning_amount", input.warning_amount)?;

        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (code, name, category, subcategory, unit, unit_price, warning_amount, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, code, name, category, subcategory, unit, unit_price, warning_amount,
                      created_by, created_at
            "#,
        )
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(input.category)
        .bind(input.subcategory)
        .bind(input.unit)
        .bind(input.unit_price)
        .bind(input.warning_amount)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(ingredient_id = %ingredient.id, code = %ingredient.code, "Ingredient created");
        Ok(ingredient)
    }

    /// List ingredients ordered by name
    pub async fn list_ingredients(&self) -> AppResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, code, name, category, subcategory, unit, unit_price, warning_amount,
                   created_by, created_at
            FROM ingredients
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(ingredients)
    }

    pub async fn get_ingredient(&self, ingredient_id: Uuid) -> AppResult<Ingredient> {
        sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, code, name, category, subcategory, unit, unit_price, warning_amount,
                   created_by, created_at
            FROM ingredients
            WHERE id = $1
            "#,
        )
        .bind(ingredient_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    /// Create a food
    pub async fn create_food(&self, user_id: Uuid, input: CreateFoodInput) -> AppResult<Food> {
        input.validate()?;
        validate_category_pair(input.category, input.subcategory)?;
        validate_non_negative("unit_price", input.unit_price)?;

        let mut meal_slots = input.meal_slots.clone();
        meal_slots.sort();
        meal_slots.dedup();
        let slot_names: Vec<&str> = meal_slots.iter().map(|s| s.as_str()).collect();

        let row = sqlx::query_as::<_, FoodRow>(&format!(
            r#"
            INSERT INTO foods (title, category, subcategory, meal_slots, preparation_minutes, unit_price, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            FOOD_COLUMNS
        ))
        .bind(input.title.trim())
        .bind(input.category)
        .bind(input.subcategory)
        .bind(&slot_names)
        .bind(input.preparation_minutes)
        .bind(input.unit_price)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let food = Food::try_from(row)?;
        tracing::info!(food_id = %food.id, title = %food.title, "Food created");
        Ok(food)
    }

    /// List foods, optionally filtered by category
    pub async fn list_foods(&self, category: Option<Category>) -> AppResult<Vec<Food>> {
        let rows = sqlx::query_as::<_, FoodRow>(&format!(
            r#"
            SELECT {}
            FROM foods
            WHERE ($1::VARCHAR IS NULL OR category = $1)
            ORDER BY title
            "#,
            FOOD_COLUMNS
        ))
        .bind(category)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Food::try_from).collect()
    }

    pub async fn get_food(&self, food_id: Uuid) -> AppResult<Food> {
        let row = sqlx::query_as::<_, FoodRow>(&format!(
            "SELECT {} FROM foods WHERE id = $1",
            FOOD_COLUMNS
        ))
        .bind(food_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Food".to_string()))?;

        Food::try_from(row)
    }

    /// Create a dessert
    pub async fn create_dessert(
        &self,
        user_id: Uuid,
        input: CreateDessertInput,
    ) -> AppResult<Dessert> {
        input.validate()?;
        validate_non_negative("unit_price", input.unit_price)?;

        let dessert = sqlx::query_as::<_, Dessert>(
            r#"
            INSERT INTO desserts (title, category, unit_price, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, category, unit_price, created_by, created_at
            "#,
        )
        .bind(input.title.trim())
        .bind(input.category)
        .bind(input.unit_price)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(dessert_id = %dessert.id, "Dessert created");
        Ok(dessert)
    }

    pub async fn list_desserts(&self) -> AppResult<Vec<Dessert>> {
        let desserts = sqlx::query_as::<_, Dessert>(
            r#"
            SELECT id, title, category, unit_price, created_by, created_at
            FROM desserts
            ORDER BY title
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(desserts)
    }
}
