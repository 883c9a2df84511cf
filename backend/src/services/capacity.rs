//! Capacity ledger: reserve servings from a menu plan
//!
//! Reservations run inside the issuing transaction. The plan row is locked
//! with `SELECT ... FOR UPDATE` before the remaining capacity is checked, so
//! concurrent issuances against one plan serialize and capacity never goes
//! negative.

use chrono::NaiveDate;
use serde::Serialize;
use shared::{reserve_capacity, CookStatus, MealSlot};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One line item's claim on a plan
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub food_id: Uuid,
    pub food_title: String,
    pub date: NaiveDate,
    pub meal_slot: MealSlot,
    pub count: i32,
}

impl ReservationRequest {
    /// Lock-ordering key; requests are reserved in ascending order
    pub fn lock_key(&self) -> (Uuid, NaiveDate, MealSlot) {
        (self.food_id, self.date, self.meal_slot)
    }
}

/// A successful reservation
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reservation {
    pub plan_id: Uuid,
    pub reserved: i32,
    pub remaining: i32,
}

#[derive(Debug, FromRow)]
struct LockedPlan {
    id: Uuid,
    capacity: i32,
    cook_status: CookStatus,
}

/// Reserve `request.count` servings from the matching plan
///
/// With `require_cooked` set, plans that are not `done` are refused.
pub async fn reserve(
    conn: &mut PgConnection,
    request: &ReservationRequest,
    require_cooked: bool,
) -> AppResult<Reservation> {
    let plan = sqlx::query_as::<_, LockedPlan>(
        r#"
        SELECT id, capacity, cook_status
        FROM menu_plans
        WHERE food_id = $1 AND plan_date = $2 AND meal_slot = $3
        FOR UPDATE
        "#,
    )
    .bind(request.food_id)
    .bind(request.date)
    .bind(request.meal_slot)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::PlanNotFound {
        food: request.food_title.clone(),
        date: request.date,
        meal_slot: request.meal_slot,
    })?;

    if require_cooked && plan.cook_status != CookStatus::Done {
        return Err(AppError::PlanNotCooked {
            food: request.food_title.clone(),
            date: request.date,
            meal_slot: request.meal_slot,
        });
    }

    let remaining = reserve_capacity(plan.capacity, request.count)
        .map_err(|e| AppError::from_capacity(&request.food_title, e))?;

    sqlx::query("UPDATE menu_plans SET capacity = $2, updated_at = NOW() WHERE id = $1")
        .bind(plan.id)
        .bind(remaining)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(
        plan_id = %plan.id,
        reserved = request.count,
        remaining,
        "Capacity reserved"
    );

    Ok(Reservation {
        plan_id: plan.id,
        reserved: request.count,
        remaining,
    })
}

/// Reserve every request in lock order, failing the whole batch on the first refusal
///
/// Results are returned in the order of `requests`.
pub async fn reserve_all(
    conn: &mut PgConnection,
    requests: &[ReservationRequest],
    require_cooked: bool,
) -> AppResult<Vec<Reservation>> {
    let mut order: Vec<usize> = (0..requests.len()).collect();
    order.sort_by_key(|&i| requests[i].lock_key());

    let mut reservations: Vec<Option<Reservation>> = vec![None; requests.len()];
    for i in order {
        reservations[i] = Some(reserve(conn, &requests[i], require_cooked).await?);
    }

    reservations
        .into_iter()
        .map(|r| r.ok_or_else(|| AppError::Internal("Reservation missing".to_string())))
        .collect()
}
