//! Error handling for the Kitchen Operations Platform
//!
//! Every failure leaves the API as `{ "error": { code, message, field?, details? } }`.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use shared::{
    calendar::{CalendarError, JalaliDate},
    CapacityError, InvalidTransition, MealSlot, PermissionDenied, RuleViolation, SlotError,
};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(#[from] PermissionDenied),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Ingredient {ingredient} does not match {expected}")]
    CategoryMismatch { ingredient: String, expected: String },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Capacity and lifecycle errors
    #[error("No menu plan for {food} on {date} ({meal_slot})")]
    PlanNotFound {
        food: String,
        date: NaiveDate,
        meal_slot: MealSlot,
    },

    #[error("Insufficient capacity for {food}: {available} available, {requested} requested")]
    InsufficientCapacity {
        food: String,
        available: i32,
        requested: i32,
    },

    #[error("Menu plan for {food} on {date} ({meal_slot}) is not cooked yet")]
    PlanNotCooked {
        food: String,
        date: NaiveDate,
        meal_slot: MealSlot,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Artifact rendering failed: {0}")]
    Artifact(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attach the food title to a capacity shortfall
    pub fn from_capacity(food: &str, err: CapacityError) -> Self {
        match err {
            CapacityError::InvalidCount { requested } => AppError::validation(
                "count",
                format!("Count for {} must be at least 1, got {}", food, requested),
            ),
            CapacityError::Insufficient {
                available,
                requested,
            } => AppError::InsufficientCapacity {
                food: food.to_string(),
                available,
                requested,
            },
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::CategoryMismatch { .. } => (StatusCode::BAD_REQUEST, "CATEGORY_MISMATCH"),
            AppError::DuplicateEntry(_) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY"),
            AppError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::PlanNotFound { .. } => (StatusCode::NOT_FOUND, "PLAN_NOT_FOUND"),
            AppError::InsufficientCapacity { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_CAPACITY"),
            AppError::PlanNotCooked { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "PLAN_NOT_COOKED"),
            AppError::InvalidStateTransition(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_STATE_TRANSITION")
            }
            AppError::Artifact(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ARTIFACT_ERROR"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) | AppError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn jalali(date: &NaiveDate) -> String {
    JalaliDate::from_gregorian(*date)
        .map(|d| d.to_string())
        .unwrap_or_else(|_| date.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (message, field, details) = match &self {
            AppError::Validation { field, message } => (message.clone(), Some(field.clone()), None),
            AppError::CategoryMismatch {
                ingredient,
                expected,
            } => (
                self.to_string(),
                Some("ingredient_id".to_string()),
                Some(json!({ "ingredient": ingredient, "expected": expected })),
            ),
            AppError::DuplicateEntry(what) => (
                format!("A record with this {} already exists", what),
                Some(what.clone()),
                None,
            ),
            AppError::Conflict { resource, message } => {
                (message.clone(), Some(resource.clone()), None)
            }
            AppError::NotFound(resource) => (format!("{} not found", resource), None, None),
            AppError::PlanNotFound {
                food,
                date,
                meal_slot,
            } => (
                format!("No menu plan for {} on {} ({})", food, jalali(date), meal_slot),
                None,
                Some(json!({ "food": food, "date": jalali(date), "meal_slot": meal_slot })),
            ),
            AppError::PlanNotCooked {
                food,
                date,
                meal_slot,
            } => (
                format!(
                    "Menu plan for {} on {} ({}) is not cooked yet",
                    food,
                    jalali(date),
                    meal_slot
                ),
                None,
                Some(json!({ "food": food, "date": jalali(date), "meal_slot": meal_slot })),
            ),
            AppError::InsufficientCapacity {
                food,
                available,
                requested,
            } => (
                self.to_string(),
                None,
                Some(json!({ "food": food, "available": available, "requested": requested })),
            ),
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None, None),
            AppError::Artifact(_) => ("Could not render token artifacts".to_string(), None, None),
            AppError::InternalError(_) => {
                ("An internal server error occurred".to_string(), None, None)
            }
            _ => (self.to_string(), None, None),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("key").to_string();
                return AppError::DuplicateEntry(constraint);
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<RuleViolation> for AppError {
    fn from(violation: RuleViolation) -> Self {
        match violation {
            RuleViolation::CategoryMismatch {
                ingredient,
                expected,
                ..
            } => AppError::CategoryMismatch {
                ingredient,
                expected: expected.to_string(),
            },
            other => AppError::validation(other.field(), other.to_string()),
        }
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        AppError::validation("meal_slot", err.to_string())
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::InvalidStateTransition(err.to_string())
    }
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        AppError::validation("date", err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::validation(*field, message)
            }
            None => AppError::validation("body", errors.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

/// JSON body extractor whose rejection renders as a validation error
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
