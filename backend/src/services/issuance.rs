//! Issuance service: sales and tokens
//!
//! Both documents reserve capacity from menu plans at creation. Creation is
//! all-or-nothing: every line item is checked and reserved inside one
//! transaction, and any refusal rolls the whole document back.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    calendar, codes::generate_issuance_code, line_total, order_total, resolve_meal_slot,
    validate_issuance_food, IssuanceKind, MealSlot, Subcategory, TokenStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::config::{ArtifactConfig, Config, IssuanceConfig};
use crate::error::{AppError, AppResult};
use crate::services::artifacts::render_token_artifacts;
use crate::services::capacity::{self, ReservationRequest};
use crate::services::catalog;

#[derive(Clone)]
pub struct IssuanceService {
    db: PgPool,
    issuance: IssuanceConfig,
    artifacts: ArtifactConfig,
}

/// Line item on a sale or token, with the unit price captured at issuance
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IssuedItem {
    pub id: Uuid,
    pub food_id: Uuid,
    pub food_title: String,
    pub menu_plan_id: Uuid,
    pub meal_slot: MealSlot,
    pub count: i32,
    pub unit_price: Decimal,
    #[sqlx(skip)]
    pub line_total: Decimal,
}

/// Sale record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub code: String,
    #[serde(with = "calendar::jalali")]
    pub issued_date: NaiveDate,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub subcategory: Subcategory,
    pub total_price: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<IssuedItem>,
}

/// Token (meal voucher) record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Token {
    pub id: Uuid,
    pub code: String,
    #[serde(with = "calendar::jalali")]
    pub issued_date: NaiveDate,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub subcategory: Subcategory,
    pub total_price: Decimal,
    pub status: TokenStatus,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<IssuedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceItemInput {
    pub food_id: Uuid,
    /// Required when the food is offered in more than one meal slot
    pub meal_slot: Option<MealSlot>,
    pub count: i32,
}

/// Input for creating a sale or a token
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIssuanceInput {
    #[serde(with = "calendar::jalali")]
    pub issued_date: NaiveDate,
    #[validate(length(min = 2, max = 200, message = "Customer name must be 2 to 200 characters"))]
    pub customer_name: String,
    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub customer_phone: Option<String>,
    pub subcategory: Subcategory,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<IssuanceItemInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssuanceFilter {
    #[serde(default, with = "calendar::jalali_option")]
    pub date: Option<NaiveDate>,
    pub status: Option<TokenStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkReceivedInput {
    #[validate(length(min = 1, max = 32, message = "Code is required"))]
    pub code: String,
}

/// Which token image to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenArtifact {
    Barcode,
    Qr,
}

struct Tables {
    header: &'static str,
    items: &'static str,
    parent: &'static str,
}

fn tables(kind: IssuanceKind) -> Tables {
    match kind {
        IssuanceKind::Sale => Tables {
            header: "sales",
            items: "sale_items",
            parent: "sale_id",
        },
        IssuanceKind::Token => Tables {
            header: "tokens",
            items: "token_items",
            parent: "token_id",
        },
    }
}

const SALE_COLUMNS: &str = "id, code, issued_date, customer_name, customer_phone, subcategory, \
                            total_price, created_by, created_at";

const TOKEN_COLUMNS: &str = "id, code, issued_date, customer_name, customer_phone, subcategory, \
                             total_price, status, received_at, received_by, created_by, created_at";

impl IssuanceService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            issuance: config.issuance.clone(),
            artifacts: config.artifacts.clone(),
        }
    }

    pub async fn create_sale(&self, user_id: Uuid, input: CreateIssuanceInput) -> AppResult<Sale> {
        let id = self.create(IssuanceKind::Sale, user_id, input).await?;
        self.get_sale(id).await
    }

    pub async fn create_token(&self, user_id: Uuid, input: CreateIssuanceInput) -> AppResult<Token> {
        let id = self.create(IssuanceKind::Token, user_id, input).await?;
        self.get_token(id).await
    }

    async fn create(
        &self,
        kind: IssuanceKind,
        user_id: Uuid,
        input: CreateIssuanceInput,
    ) -> AppResult<Uuid> {
        input.validate()?;

        let required = kind.required_category();
        if input.subcategory.category() != required {
            return Err(AppError::validation(
                "subcategory",
                format!("A {} needs a {} subcategory, got {}", kind, required, input.subcategory),
            ));
        }
        for (i, item) in input.items.iter().enumerate() {
            if item.count < 1 {
                return Err(AppError::validation(
                    format!("items[{}].count", i),
                    "Count must be at least 1",
                ));
            }
        }

        let mut tx = self.db.begin().await?;

        let mut food_ids: Vec<Uuid> = input.items.iter().map(|item| item.food_id).collect();
        food_ids.sort();
        food_ids.dedup();
        let foods: HashMap<Uuid, catalog::Food> = catalog::foods_by_ids(&mut tx, &food_ids)
            .await?
            .into_iter()
            .map(|food| (food.id, food))
            .collect();

        let mut requests = Vec::with_capacity(input.items.len());
        let mut prices = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let food = foods
                .get(&item.food_id)
                .ok_or_else(|| AppError::NotFound(format!("Food {}", item.food_id)))?;
            let pair = food.category_pair().ok_or_else(|| {
                AppError::Internal(format!("Stored food {} has an invalid category", food.id))
            })?;

            validate_issuance_food(kind, input.subcategory, &food.title, pair)?;
            let meal_slot = resolve_meal_slot(&food.title, &food.meal_slots, item.meal_slot)?;

            requests.push(ReservationRequest {
                food_id: food.id,
                food_title: food.title.clone(),
                date: input.issued_date,
                meal_slot,
                count: item.count,
            });
            prices.push(food.unit_price);
        }

        let reservations =
            capacity::reserve_all(&mut tx, &requests, self.issuance.require_cooked_plan).await?;

        let total = order_total(prices.iter().copied().zip(requests.iter().map(|r| r.count)));
        let (id, code) = self
            .insert_header(&mut tx, kind, user_id, &input, total)
            .await?;

        let t = tables(kind);
        for ((request, reservation), price) in requests.iter().zip(&reservations).zip(&prices) {
            sqlx::query(&format!(
                r#"
                INSERT INTO {} ({}, food_id, menu_plan_id, meal_slot, count, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
                t.items, t.parent
            ))
            .bind(id)
            .bind(request.food_id)
            .bind(reservation.plan_id)
            .bind(request.meal_slot)
            .bind(request.count)
            .bind(*price)
            .execute(&mut *tx)
            .await?;
        }

        if kind == IssuanceKind::Token {
            let artifacts = render_token_artifacts(&code, &self.artifacts)?;
            sqlx::query("UPDATE tokens SET barcode_png = $2, qr_png = $3 WHERE id = $1")
                .bind(id)
                .bind(&artifacts.barcode_png)
                .bind(&artifacts.qr_png)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            kind = %kind,
            id = %id,
            code = %code,
            items = requests.len(),
            total = %total,
            "Issued"
        );
        Ok(id)
    }

    /// Insert the document header under a fresh unique code
    async fn insert_header(
        &self,
        conn: &mut PgConnection,
        kind: IssuanceKind,
        user_id: Uuid,
        input: &CreateIssuanceInput,
        total: Decimal,
    ) -> AppResult<(Uuid, String)> {
        let t = tables(kind);
        for attempt in 1..=self.issuance.code_attempts.max(1) {
            let code = generate_issuance_code(self.issuance.code_length);
            let id = sqlx::query_scalar::<_, Uuid>(&format!(
                r#"
                INSERT INTO {} (code, issued_date, customer_name, customer_phone, subcategory, total_price, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (code) DO NOTHING
                RETURNING id
                "#,
                t.header
            ))
            .bind(&code)
            .bind(input.issued_date)
            .bind(input.customer_name.trim())
            .bind(&input.customer_phone)
            .bind(input.subcategory)
            .bind(total)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(id) = id {
                return Ok((id, code));
            }
            tracing::warn!(kind = %kind, attempt, "Issuance code collision, retrying");
        }

        Err(AppError::Conflict {
            resource: "code".to_string(),
            message: "Could not allocate a unique code".to_string(),
        })
    }

    async fn items(&self, kind: IssuanceKind, parent_id: Uuid) -> AppResult<Vec<IssuedItem>> {
        let t = tables(kind);
        let items = sqlx::query_as::<_, IssuedItem>(&format!(
            r#"
            SELECT it.id, it.food_id, f.title AS food_title, it.menu_plan_id, it.meal_slot,
                   it.count, it.unit_price
            FROM {} it
            JOIN foods f ON f.id = it.food_id
            WHERE it.{} = $1
            ORDER BY f.title
            "#,
            t.items, t.parent
        ))
        .bind(parent_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items
            .into_iter()
            .map(|mut item| {
                item.line_total = line_total(item.unit_price, item.count);
                item
            })
            .collect())
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<Sale> {
        let mut sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE id = $1",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        sale.items = self.items(IssuanceKind::Sale, sale.id).await?;
        Ok(sale)
    }

    /// List sales, newest first; items are not loaded
    pub async fn list_sales(&self, filter: IssuanceFilter) -> AppResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {} FROM sales
            WHERE ($1::DATE IS NULL OR issued_date = $1)
            ORDER BY issued_date DESC, created_at DESC
            "#,
            SALE_COLUMNS
        ))
        .bind(filter.date)
        .fetch_all(&self.db)
        .await?;

        Ok(sales)
    }

    pub async fn get_token(&self, token_id: Uuid) -> AppResult<Token> {
        let mut token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {} FROM tokens WHERE id = $1",
            TOKEN_COLUMNS
        ))
        .bind(token_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Token".to_string()))?;

        token.items = self.items(IssuanceKind::Token, token.id).await?;
        Ok(token)
    }

    /// List tokens, newest first; items are not loaded
    pub async fn list_tokens(&self, filter: IssuanceFilter) -> AppResult<Vec<Token>> {
        let tokens = sqlx::query_as::<_, Token>(&format!(
            r#"
            SELECT {} FROM tokens
            WHERE ($1::DATE IS NULL OR issued_date = $1)
              AND ($2::VARCHAR IS NULL OR status = $2)
            ORDER BY issued_date DESC, created_at DESC
            "#,
            TOKEN_COLUMNS
        ))
        .bind(filter.date)
        .bind(filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(tokens)
    }

    /// Mark a token as handed over at the delivery desk
    pub async fn mark_received(&self, user_id: Uuid, input: MarkReceivedInput) -> AppResult<Token> {
        input.validate()?;
        let code = input.code.trim().to_ascii_uppercase();

        let mut tx = self.db.begin().await?;

        let (token_id, status) = sqlx::query_as::<_, (Uuid, TokenStatus)>(
            "SELECT id, status FROM tokens WHERE code = $1 FOR UPDATE",
        )
        .bind(&code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Token".to_string()))?;

        if status == TokenStatus::Received {
            return Err(AppError::Conflict {
                resource: "token".to_string(),
                message: format!("Token {} has already been received", code),
            });
        }

        sqlx::query(
            r#"
            UPDATE tokens
            SET status = $2, received_at = NOW(), received_by = $3
            WHERE id = $1
            "#,
        )
        .bind(token_id)
        .bind(TokenStatus::Received)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(token_id = %token_id, code = %code, "Token received");
        self.get_token(token_id).await
    }

    /// Stored PNG for a token
    pub async fn token_artifact(&self, token_id: Uuid, artifact: TokenArtifact) -> AppResult<Vec<u8>> {
        let column = match artifact {
            TokenArtifact::Barcode => "barcode_png",
            TokenArtifact::Qr => "qr_png",
        };

        let png = sqlx::query_scalar::<_, Option<Vec<u8>>>(&format!(
            "SELECT {} FROM tokens WHERE id = $1",
            column
        ))
        .bind(token_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Token".to_string()))?;

        png.ok_or_else(|| AppError::NotFound("Token artifact".to_string()))
    }
}
