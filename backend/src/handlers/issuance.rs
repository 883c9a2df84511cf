//! HTTP handlers for sales and tokens

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shared::Operation;
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::middleware::CurrentUser;
use crate::services::issuance::{
    CreateIssuanceInput, IssuanceFilter, MarkReceivedInput, Sale, Token, TokenArtifact,
};
use crate::services::IssuanceService;
use crate::AppState;

/// Create a sale, reserving capacity for every item
pub async fn create_sale(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<CreateIssuanceInput>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    user.authorize(Operation::CreateSale)?;
    let service = IssuanceService::new(state.db, &state.config);
    let sale = service.create_sale(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<IssuanceFilter>,
) -> AppResult<Json<Vec<Sale>>> {
    user.authorize(Operation::ViewSales)?;
    let service = IssuanceService::new(state.db, &state.config);
    Ok(Json(service.list_sales(filter).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<Sale>> {
    user.authorize(Operation::ViewSales)?;
    let service = IssuanceService::new(state.db, &state.config);
    Ok(Json(service.get_sale(sale_id).await?))
}

/// Issue a token, reserving capacity and rendering its barcode and QR code
pub async fn create_token(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<CreateIssuanceInput>,
) -> AppResult<(StatusCode, Json<Token>)> {
    user.authorize(Operation::IssueToken)?;
    let service = IssuanceService::new(state.db, &state.config);
    let token = service.create_token(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn list_tokens(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<IssuanceFilter>,
) -> AppResult<Json<Vec<Token>>> {
    user.authorize(Operation::ViewTokens)?;
    let service = IssuanceService::new(state.db, &state.config);
    Ok(Json(service.list_tokens(filter).await?))
}

pub async fn get_token(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(token_id): Path<Uuid>,
) -> AppResult<Json<Token>> {
    user.authorize(Operation::ViewTokens)?;
    let service = IssuanceService::new(state.db, &state.config);
    Ok(Json(service.get_token(token_id).await?))
}

/// Mark a token as handed over, by its printed code
pub async fn mark_token_received(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<MarkReceivedInput>,
) -> AppResult<Json<Token>> {
    user.authorize(Operation::MarkTokenReceived)?;
    let service = IssuanceService::new(state.db, &state.config);
    Ok(Json(service.mark_received(user.user_id(), input).await?))
}

pub async fn get_token_barcode(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(token_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    token_png(state, user, token_id, TokenArtifact::Barcode).await
}

pub async fn get_token_qr(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(token_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    token_png(state, user, token_id, TokenArtifact::Qr).await
}

async fn token_png(
    state: AppState,
    user: CurrentUser,
    token_id: Uuid,
    artifact: TokenArtifact,
) -> AppResult<impl IntoResponse> {
    user.authorize(Operation::ViewTokens)?;
    let service = IssuanceService::new(state.db, &state.config);
    let png = service.token_artifact(token_id, artifact).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
