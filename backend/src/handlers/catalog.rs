//! HTTP handlers for the catalog: ingredients, foods, desserts and BOM lines

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{BomRequirement, Category, Operation};
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::middleware::CurrentUser;
use crate::services::bom::{AddBomLineInput, BomLine};
use crate::services::catalog::{
    CreateDessertInput, CreateFoodInput, CreateIngredientInput, Dessert, Food, Ingredient,
};
use crate::services::{BomService, CatalogService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FoodQuery {
    pub category: Option<Category>,
}

/// Create an ingredient
pub async fn create_ingredient(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<CreateIngredientInput>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    user.authorize(Operation::ManageCatalog)?;
    let service = CatalogService::new(state.db);
    let ingredient = service.create_ingredient(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Ingredient>>> {
    user.authorize(Operation::ViewCatalog)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_ingredients().await?))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    user.authorize(Operation::ViewCatalog)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_ingredient(ingredient_id).await?))
}

/// Create a food
pub async fn create_food(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<CreateFoodInput>,
) -> AppResult<(StatusCode, Json<Food>)> {
    user.authorize(Operation::ManageCatalog)?;
    let service = CatalogService::new(state.db);
    let food = service.create_food(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(food)))
}

pub async fn list_foods(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<FoodQuery>,
) -> AppResult<Json<Vec<Food>>> {
    user.authorize(Operation::ViewCatalog)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_foods(query.category).await?))
}

pub async fn get_food(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(food_id): Path<Uuid>,
) -> AppResult<Json<Food>> {
    user.authorize(Operation::ViewCatalog)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_food(food_id).await?))
}

/// Resolved bill of materials for a food
pub async fn get_food_ingredients(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(food_id): Path<Uuid>,
) -> AppResult<Json<Vec<BomRequirement>>> {
    user.authorize(Operation::ViewCatalog)?;
    let service = BomService::new(state.db);
    Ok(Json(service.lines_for_food(food_id).await?))
}

/// Add an ingredient to a food's bill of materials
pub async fn add_food_ingredient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(food_id): Path<Uuid>,
    AppJson(input): AppJson<AddBomLineInput>,
) -> AppResult<(StatusCode, Json<BomLine>)> {
    user.authorize(Operation::ManageCatalog)?;
    let service = BomService::new(state.db);
    let line = service.add_line(food_id, input).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

pub async fn create_dessert(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<CreateDessertInput>,
) -> AppResult<(StatusCode, Json<Dessert>)> {
    user.authorize(Operation::ManageCatalog)?;
    let service = CatalogService::new(state.db);
    let dessert = service.create_dessert(user.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(dessert)))
}

pub async fn list_desserts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Dessert>>> {
    user.authorize(Operation::ViewCatalog)?;
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_desserts().await?))
}
