//! Route definitions for the Kitchen Operations Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - catalog
        .nest("/ingredients", ingredient_routes(state.clone()))
        .nest("/foods", food_routes(state.clone()))
        .nest("/desserts", dessert_routes(state.clone()))
        // Protected routes - menu planning
        .nest("/menu-plans", menu_plan_routes(state.clone()))
        // Protected routes - stock ledger
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - sales and tokens
        .nest("/sales", sale_routes(state.clone()))
        .nest("/tokens", token_routes(state))
}

fn ingredient_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route("/:ingredient_id", get(handlers::get_ingredient))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn food_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_foods).post(handlers::create_food))
        .route("/:food_id", get(handlers::get_food))
        .route(
            "/:food_id/ingredients",
            get(handlers::get_food_ingredients).post(handlers::add_food_ingredient),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn dessert_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_desserts).post(handlers::create_dessert),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Menu plan routes (protected)
fn menu_plan_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_menu_plans).post(handlers::create_menu_plan),
        )
        .route("/:plan_id", get(handlers::get_menu_plan))
        .route(
            "/:plan_id/cook-status",
            post(handlers::update_cook_status).put(handlers::update_cook_status),
        )
        .route("/:plan_id/consumption", post(handlers::post_consumption))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock ledger routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/receipts", post(handlers::record_receipt))
        .route("/inspections", post(handlers::record_inspection))
        .route("/:ingredient_id", get(handlers::get_ingredient_stock))
        .route(
            "/:ingredient_id/reconciliation",
            get(handlers::get_reconciliation),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn sale_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/:sale_id", get(handlers::get_sale))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Token routes (protected)
fn token_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_tokens).post(handlers::create_token))
        .route("/mark-received", post(handlers::mark_token_received))
        .route("/:token_id", get(handlers::get_token))
        .route("/:token_id/barcode.png", get(handlers::get_token_barcode))
        .route("/:token_id/qrcode.png", get(handlers::get_token_qr))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
