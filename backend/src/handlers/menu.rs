//! HTTP handlers for menu plans and cook status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::Operation;
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::middleware::CurrentUser;
use crate::services::consumption::{ConsumptionRecord, PostingOutcome};
use crate::services::menu::{
    CookStatusOutcome, CreateMenuPlanInput, MenuPlan, MenuPlanFilter, UpdateCookStatusInput,
};
use crate::services::{ConsumptionPoster, MenuService};
use crate::AppState;

/// Plan with the consumption posted against it
#[derive(Debug, Serialize)]
pub struct MenuPlanDetail {
    #[serde(flatten)]
    pub plan: MenuPlan,
    pub consumption: Vec<ConsumptionRecord>,
}

/// Create a menu plan
pub async fn create_menu_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<CreateMenuPlanInput>,
) -> AppResult<(StatusCode, Json<MenuPlan>)> {
    user.authorize(Operation::PlanMenu)?;
    let service = MenuService::new(state.db);
    let plan = service.create_plan(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn list_menu_plans(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<MenuPlanFilter>,
) -> AppResult<Json<Vec<MenuPlan>>> {
    user.authorize(Operation::ViewMenu)?;
    let service = MenuService::new(state.db);
    Ok(Json(service.list_plans(filter).await?))
}

pub async fn get_menu_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<MenuPlanDetail>> {
    user.authorize(Operation::ViewMenu)?;
    let plan = MenuService::new(state.db.clone()).get_plan(plan_id).await?;
    let consumption = ConsumptionPoster::new(state.db)
        .records_for_plan(plan_id)
        .await?;
    Ok(Json(MenuPlanDetail { plan, consumption }))
}

/// Move a plan's cook status forward; entering `done` posts consumption
pub async fn update_cook_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(plan_id): Path<Uuid>,
    AppJson(input): AppJson<UpdateCookStatusInput>,
) -> AppResult<Json<CookStatusOutcome>> {
    user.authorize(Operation::UpdateCookStatus)?;
    let service = MenuService::new(state.db);
    let outcome = service
        .update_cook_status(plan_id, user.user_id(), input.cook_status)
        .await?;
    Ok(Json(outcome))
}

/// Re-run consumption posting for a cooked plan; a no-op when already posted
pub async fn post_consumption(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<PostingOutcome>> {
    user.authorize(Operation::UpdateCookStatus)?;
    let service = MenuService::new(state.db);
    Ok(Json(service.post_consumption(plan_id, user.user_id()).await?))
}
