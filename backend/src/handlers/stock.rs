//! HTTP handlers for the stock ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::Operation;
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::middleware::CurrentUser;
use crate::services::stock::{
    IngredientStock, ReconciliationQuery, ReconciliationReport, RecordInspectionInput,
    RecordReceiptInput, StockInspection, StockLevel, StockReceipt,
};
use crate::services::StockService;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub low_only: bool,
}

pub async fn list_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<Vec<StockLevel>>> {
    user.authorize(Operation::ViewStock)?;
    let service = StockService::new(state.db);
    Ok(Json(service.list_levels(query.low_only).await?))
}

pub async fn get_ingredient_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<IngredientStock>> {
    user.authorize(Operation::ViewStock)?;
    let service = StockService::new(state.db);
    Ok(Json(service.get_ingredient_stock(ingredient_id).await?))
}

/// Record goods received
pub async fn record_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<RecordReceiptInput>,
) -> AppResult<(StatusCode, Json<StockReceipt>)> {
    user.authorize(Operation::RecordStockReceipt)?;
    let service = StockService::new(state.db);
    let receipt = service.record_receipt(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Record a physical stock count
pub async fn record_inspection(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<RecordInspectionInput>,
) -> AppResult<(StatusCode, Json<StockInspection>)> {
    user.authorize(Operation::RecordStockInspection)?;
    let service = StockService::new(state.db);
    let inspection = service.record_inspection(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(inspection)))
}

pub async fn get_reconciliation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Query(query): Query<ReconciliationQuery>,
) -> AppResult<Json<ReconciliationReport>> {
    user.authorize(Operation::ViewStock)?;
    let service = StockService::new(state.db);
    Ok(Json(service.reconciliation(ingredient_id, query).await?))
}
