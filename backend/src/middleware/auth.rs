//! Authentication middleware
//!
//! Verifies the bearer JWT issued by the identity service and attaches the
//! resulting [`Actor`] to the request. Authorization against the policy table
//! happens in handlers through [`CurrentUser::authorize`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{Actor, Operation, Role};
use uuid::Uuid;

use crate::{error::AppError, AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub is_central: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Decode and validate a JWT, producing the actor it describes
pub fn decode_actor(token: &str, secret: &str, leeway_secs: u64) -> Result<Actor, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway_secs;

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::InvalidToken
        })?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

    let roles = claims
        .roles
        .iter()
        .map(|r| r.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Unauthorized(format!("Invalid role in token: {}", e.value)))?;

    Ok(Actor::new(user_id, claims.is_central, roles))
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    match decode_actor(bearer.token(), &state.config.jwt.secret, state.config.jwt.leeway_secs) {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Extractor for the authenticated actor
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Actor);

impl CurrentUser {
    /// Check the policy table; denials are logged and never reach a service
    pub fn authorize(&self, operation: Operation) -> Result<(), AppError> {
        self.0.authorize(operation).map_err(|denied| {
            tracing::warn!(
                user_id = %self.0.user_id,
                operation = %operation,
                "Permission denied"
            );
            AppError::from(denied)
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
