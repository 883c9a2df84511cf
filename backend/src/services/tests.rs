//! Service tests against a migrated Postgres database
//!
//! Each `#[sqlx::test]` gets a fresh database built from `./migrations`.
//! Requires `DATABASE_URL` to point at a server the tests may create
//! databases on.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{Category, CookStatus, MealSlot, Subcategory, Unit};
use sqlx::PgPool;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use crate::config::{
    ArtifactConfig, Config, DatabaseConfig, IssuanceConfig, JwtConfig, ServerConfig,
};
use crate::error::AppError;
use crate::services::bom::AddBomLineInput;
use crate::services::capacity::{self, ReservationRequest};
use crate::services::catalog::{CreateFoodInput, CreateIngredientInput, Food};
use crate::services::consumption::PostingOutcome;
use crate::services::issuance::{CreateIssuanceInput, IssuanceItemInput};
use crate::services::menu::CreateMenuPlanInput;
use crate::services::stock::{RecordInspectionInput, RecordReceiptInput};
use crate::services::unit_of_work::{DeferredEffect, UnitOfWork};
use crate::services::{
    BomService, CatalogService, ConsumptionPoster, IssuanceService, MenuService, StockService,
};

// ============================================================================
// Fixtures
// ============================================================================

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            leeway_secs: 0,
        },
        issuance: IssuanceConfig {
            require_cooked_plan: false,
            code_length: shared::codes::DEFAULT_CODE_LENGTH,
            code_attempts: 5,
        },
        artifacts: ArtifactConfig {
            barcode_height: 80,
            barcode_module_width: 2,
            qr_module_size: 8,
        },
    }
}

fn service_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 18).unwrap()
}

async fn seed_food(pool: &PgPool, title: &str) -> Food {
    CatalogService::new(pool.clone())
        .create_food(
            Uuid::new_v4(),
            CreateFoodInput {
                title: title.to_string(),
                category: Category::Normal,
                subcategory: Subcategory::Staff,
                meal_slots: vec![MealSlot::Lunch],
                preparation_minutes: 45,
                unit_price: Decimal::from(45_000),
            },
        )
        .await
        .unwrap()
}

async fn seed_ingredient(pool: &PgPool, code: &str, name: &str) -> Uuid {
    CatalogService::new(pool.clone())
        .create_ingredient(
            Uuid::new_v4(),
            CreateIngredientInput {
                code: code.to_string(),
                name: name.to_string(),
                category: Category::Normal,
                subcategory: Subcategory::Staff,
                unit: Unit::G,
                unit_price: Decimal::ZERO,
                warning_amount: Decimal::ZERO,
            },
        )
        .await
        .unwrap()
        .id
}

async fn seed_plan(pool: &PgPool, food_id: Uuid, capacity: i32) -> Uuid {
    MenuService::new(pool.clone())
        .create_plan(
            Uuid::new_v4(),
            CreateMenuPlanInput {
                plan_date: service_day(),
                food_id,
                meal_slot: MealSlot::Lunch,
                capacity,
                dessert_id: None,
                dessert_count: 0,
            },
        )
        .await
        .unwrap()
        .id
}

/// Food with one 200 g rice line, a lunch plan of `capacity`, and 10 kg of rice in stock
async fn seed_rice_plan(pool: &PgPool, capacity: i32) -> (Food, Uuid, Uuid) {
    let food = seed_food(pool, "Chelow").await;
    let rice = seed_ingredient(pool, "RICE-01", "Rice").await;

    BomService::new(pool.clone())
        .add_line(
            food.id,
            AddBomLineInput {
                ingredient_id: rice,
                amount_per_serving: 200,
            },
        )
        .await
        .unwrap();

    StockService::new(pool.clone())
        .record_receipt(
            Uuid::new_v4(),
            RecordReceiptInput {
                ingredient_id: rice,
                amount: Decimal::from(10_000),
                delivery_code: None,
                received_date: service_day(),
            },
        )
        .await
        .unwrap();

    let plan_id = seed_plan(pool, food.id, capacity).await;
    (food, rice, plan_id)
}

fn sale_input(items: Vec<(Uuid, i32)>) -> CreateIssuanceInput {
    CreateIssuanceInput {
        issued_date: service_day(),
        customer_name: "Reza Karimi".to_string(),
        customer_phone: None,
        subcategory: Subcategory::Staff,
        items: items
            .into_iter()
            .map(|(food_id, count)| IssuanceItemInput {
                food_id,
                meal_slot: None,
                count,
            })
            .collect(),
    }
}

async fn plan_capacity(pool: &PgPool, plan_id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT capacity FROM menu_plans WHERE id = $1")
        .bind(plan_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Capacity and issuance
// ============================================================================

/// Test a sale draws capacity down and an oversized one is refused
#[sqlx::test(migrations = "./migrations")]
async fn test_sale_then_refusal_leaves_remaining(pool: PgPool) {
    let food = seed_food(&pool, "Chelow").await;
    let plan_id = seed_plan(&pool, food.id, 50).await;
    let issuance = IssuanceService::new(pool.clone(), &test_config());

    let sale = assert_ok!(
        issuance
            .create_sale(Uuid::new_v4(), sale_input(vec![(food.id, 10)]))
            .await
    );
    assert_eq!(sale.total_price, Decimal::from(450_000));
    assert_eq!(sale.items.len(), 1);
    assert_eq!(plan_capacity(&pool, plan_id).await, 40);

    let err = assert_err!(
        issuance
            .create_sale(Uuid::new_v4(), sale_input(vec![(food.id, 45)]))
            .await
    );
    assert!(matches!(
        err,
        AppError::InsufficientCapacity {
            available: 40,
            requested: 45,
            ..
        }
    ));
    assert_eq!(plan_capacity(&pool, plan_id).await, 40);
    assert_eq!(count_rows(&pool, "sales").await, 1);
}

/// Test a multi-item sale with one refused line reserves nothing
#[sqlx::test(migrations = "./migrations")]
async fn test_failed_multi_item_sale_rolls_back(pool: PgPool) {
    let chelow = seed_food(&pool, "Chelow").await;
    let kabab = seed_food(&pool, "Kabab").await;
    let chelow_plan = seed_plan(&pool, chelow.id, 40).await;
    let kabab_plan = seed_plan(&pool, kabab.id, 5).await;
    let issuance = IssuanceService::new(pool.clone(), &test_config());

    let err = assert_err!(
        issuance
            .create_sale(
                Uuid::new_v4(),
                sale_input(vec![(chelow.id, 5), (kabab.id, 6)]),
            )
            .await
    );
    assert!(matches!(
        err,
        AppError::InsufficientCapacity {
            available: 5,
            requested: 6,
            ..
        }
    ));

    assert_eq!(plan_capacity(&pool, chelow_plan).await, 40);
    assert_eq!(plan_capacity(&pool, kabab_plan).await, 5);
    assert_eq!(count_rows(&pool, "sales").await, 0);
    assert_eq!(count_rows(&pool, "sale_items").await, 0);
}

/// Test reserve_all returns reservations in request order and fails as a batch
#[sqlx::test(migrations = "./migrations")]
async fn test_reserve_all(pool: PgPool) {
    let chelow = seed_food(&pool, "Chelow").await;
    let kabab = seed_food(&pool, "Kabab").await;
    let chelow_plan = seed_plan(&pool, chelow.id, 20).await;
    let kabab_plan = seed_plan(&pool, kabab.id, 3).await;

    let request = |food: &Food, count| ReservationRequest {
        food_id: food.id,
        food_title: food.title.clone(),
        date: service_day(),
        meal_slot: MealSlot::Lunch,
        count,
    };

    let mut tx = pool.begin().await.unwrap();
    let reservations = assert_ok!(
        capacity::reserve_all(&mut tx, &[request(&kabab, 2), request(&chelow, 7)], false).await
    );
    assert_eq!(reservations[0].plan_id, kabab_plan);
    assert_eq!(reservations[0].remaining, 1);
    assert_eq!(reservations[1].plan_id, chelow_plan);
    assert_eq!(reservations[1].remaining, 13);

    assert_err!(
        capacity::reserve_all(&mut tx, &[request(&chelow, 1), request(&kabab, 2)], false).await
    );
    drop(tx);

    assert_eq!(plan_capacity(&pool, chelow_plan).await, 20);
    assert_eq!(plan_capacity(&pool, kabab_plan).await, 3);
}

/// Test uncooked plans are refused when cooking is required first
#[sqlx::test(migrations = "./migrations")]
async fn test_require_cooked_plan(pool: PgPool) {
    let food = seed_food(&pool, "Chelow").await;
    let plan_id = seed_plan(&pool, food.id, 10).await;
    let mut config = test_config();
    config.issuance.require_cooked_plan = true;
    let issuance = IssuanceService::new(pool.clone(), &config);

    let err = assert_err!(
        issuance
            .create_sale(Uuid::new_v4(), sale_input(vec![(food.id, 1)]))
            .await
    );
    assert!(matches!(err, AppError::PlanNotCooked { .. }));
    assert_eq!(plan_capacity(&pool, plan_id).await, 10);
}

/// Test concurrent sales against one plan never oversell
#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_sales_never_oversell(pool: PgPool) {
    let food = seed_food(&pool, "Chelow").await;
    let plan_id = seed_plan(&pool, food.id, 50).await;
    let issuance = IssuanceService::new(pool.clone(), &test_config());

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let issuance = issuance.clone();
            let food_id = food.id;
            tokio::spawn(async move {
                issuance
                    .create_sale(Uuid::new_v4(), sale_input(vec![(food_id, 3)]))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::InsufficientCapacity { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(accepted, 16);
    assert_eq!(plan_capacity(&pool, plan_id).await, 2);
    assert_eq!(count_rows(&pool, "sales").await, 16);
}

// ============================================================================
// Cook status and consumption posting
// ============================================================================

/// Test marking a plan done posts once at the remaining capacity
#[sqlx::test(migrations = "./migrations")]
async fn test_done_posts_remaining_capacity_once(pool: PgPool) {
    let (food, rice, plan_id) = seed_rice_plan(&pool, 50).await;
    let user = Uuid::new_v4();
    IssuanceService::new(pool.clone(), &test_config())
        .create_sale(user, sale_input(vec![(food.id, 10)]))
        .await
        .unwrap();

    let menu = MenuService::new(pool.clone());
    let cooking = assert_ok!(menu.update_cook_status(plan_id, user, CookStatus::Cooking).await);
    assert!(cooking.consumption.is_none());

    let done = assert_ok!(menu.update_cook_status(plan_id, user, CookStatus::Done).await);
    assert!(matches!(
        done.consumption,
        Some(PostingOutcome::Posted {
            records: 1,
            capacity: 40,
            ..
        })
    ));

    let again = assert_ok!(menu.update_cook_status(plan_id, user, CookStatus::Done).await);
    assert!(!again.changed);
    assert!(again.consumption.is_none());
    assert!(matches!(
        assert_ok!(menu.post_consumption(plan_id, user).await),
        PostingOutcome::AlreadyPosted
    ));

    let records = assert_ok!(
        ConsumptionPoster::new(pool.clone())
            .records_for_plan(plan_id)
            .await
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].consumed_amount, Decimal::from(8_000));

    let stock = assert_ok!(StockService::new(pool.clone()).get_ingredient_stock(rice).await);
    assert_eq!(stock.level.total_amount, Decimal::from(2_000));
}

/// Test posting uses the capacity captured at the transition, not a later one
#[sqlx::test(migrations = "./migrations")]
async fn test_posting_uses_captured_capacity(pool: PgPool) {
    let (food, _rice, plan_id) = seed_rice_plan(&pool, 50).await;
    let user = Uuid::new_v4();
    let issuance = IssuanceService::new(pool.clone(), &test_config());
    issuance
        .create_sale(user, sale_input(vec![(food.id, 10)]))
        .await
        .unwrap();

    // Plan is done at 40; a sale lands before the deferred posting runs
    sqlx::query("UPDATE menu_plans SET cook_status = 'done' WHERE id = $1")
        .bind(plan_id)
        .execute(&pool)
        .await
        .unwrap();
    issuance
        .create_sale(user, sale_input(vec![(food.id, 10)]))
        .await
        .unwrap();
    assert_eq!(plan_capacity(&pool, plan_id).await, 30);

    let outcome = assert_ok!(
        ConsumptionPoster::new(pool.clone())
            .post(plan_id, user, Some(40))
            .await
    );
    assert!(matches!(
        outcome,
        PostingOutcome::Posted {
            records: 1,
            capacity: 40,
            ..
        }
    ));

    let records = ConsumptionPoster::new(pool.clone())
        .records_for_plan(plan_id)
        .await
        .unwrap();
    assert_eq!(records[0].consumed_amount, Decimal::from(8_000));
}

/// Test a manual posting without a captured value uses the current capacity
#[sqlx::test(migrations = "./migrations")]
async fn test_manual_posting_uses_current_capacity(pool: PgPool) {
    let (_food, _rice, plan_id) = seed_rice_plan(&pool, 30).await;
    let user = Uuid::new_v4();
    let poster = ConsumptionPoster::new(pool.clone());

    assert!(matches!(
        assert_ok!(poster.post(plan_id, user, None).await),
        PostingOutcome::NotDone
    ));

    sqlx::query("UPDATE menu_plans SET cook_status = 'done' WHERE id = $1")
        .bind(plan_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(
        assert_ok!(poster.post(plan_id, user, None).await),
        PostingOutcome::Posted {
            records: 1,
            capacity: 30,
            ..
        }
    ));
    let records = poster.records_for_plan(plan_id).await.unwrap();
    assert_eq!(records[0].consumed_amount, Decimal::from(6_000));
}

/// Test over-consumption floors stock at zero and reports the clamp
#[sqlx::test(migrations = "./migrations")]
async fn test_posting_clamps_at_zero(pool: PgPool) {
    let (_food, rice, plan_id) = seed_rice_plan(&pool, 60).await;
    let user = Uuid::new_v4();
    let menu = MenuService::new(pool.clone());

    menu.update_cook_status(plan_id, user, CookStatus::Cooking)
        .await
        .unwrap();
    let done = assert_ok!(menu.update_cook_status(plan_id, user, CookStatus::Done).await);

    match done.consumption {
        Some(PostingOutcome::Posted { clamps, .. }) => {
            assert_eq!(clamps.len(), 1);
            assert_eq!(clamps[0].requested, Decimal::from(12_000));
            assert_eq!(clamps[0].available, Decimal::from(10_000));
        }
        other => panic!("expected a posting, got {:?}", other),
    }

    let stock = StockService::new(pool.clone())
        .get_ingredient_stock(rice)
        .await
        .unwrap();
    assert_eq!(stock.level.total_amount, Decimal::ZERO);
}

/// Test cook status cannot move backwards
#[sqlx::test(migrations = "./migrations")]
async fn test_cook_status_backwards_refused(pool: PgPool) {
    let (_food, _rice, plan_id) = seed_rice_plan(&pool, 10).await;
    let user = Uuid::new_v4();
    let menu = MenuService::new(pool.clone());

    menu.update_cook_status(plan_id, user, CookStatus::Cooking)
        .await
        .unwrap();
    let err = assert_err!(menu.update_cook_status(plan_id, user, CookStatus::Pending).await);
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

// ============================================================================
// Stock
// ============================================================================

/// Test a receipt writes the log entry and the level together
#[sqlx::test(migrations = "./migrations")]
async fn test_receipt_updates_level(pool: PgPool) {
    let rice = seed_ingredient(&pool, "RICE-01", "Rice").await;
    let stock = StockService::new(pool.clone());
    let user = Uuid::new_v4();

    for amount in [500, 250] {
        assert_ok!(
            stock
                .record_receipt(
                    user,
                    RecordReceiptInput {
                        ingredient_id: rice,
                        amount: Decimal::from(amount),
                        delivery_code: Some("DLV-7".to_string()),
                        received_date: service_day(),
                    },
                )
                .await
        );
    }

    let level = assert_ok!(stock.get_ingredient_stock(rice).await);
    assert_eq!(level.level.total_amount, Decimal::from(750));
    assert_eq!(level.level.last_received_date, Some(service_day()));
    assert_eq!(level.receipts.len(), 2);

    let missing = stock
        .record_receipt(
            user,
            RecordReceiptInput {
                ingredient_id: Uuid::new_v4(),
                amount: Decimal::from(100),
                delivery_code: None,
                received_date: service_day(),
            },
        )
        .await;
    assert_err!(missing);
    assert_eq!(count_rows(&pool, "stock_receipts").await, 2);
}

/// Test an inspection overwrites the running total
#[sqlx::test(migrations = "./migrations")]
async fn test_inspection_overwrites_total(pool: PgPool) {
    let (_food, rice, _plan_id) = seed_rice_plan(&pool, 10).await;
    let stock = StockService::new(pool.clone());

    assert_ok!(
        stock
            .record_inspection(
                Uuid::new_v4(),
                RecordInspectionInput {
                    ingredient_id: rice,
                    actual_amount: Decimal::from(9_400),
                    inspection_date: service_day(),
                    notes: None,
                },
            )
            .await
    );

    let level = stock.get_ingredient_stock(rice).await.unwrap();
    assert_eq!(level.level.total_amount, Decimal::from(9_400));
    assert_eq!(level.inspections.len(), 1);
}

// ============================================================================
// Unit of work
// ============================================================================

/// Test effects are released only by a successful commit
#[sqlx::test(migrations = "./migrations")]
async fn test_unit_of_work_effects(pool: PgPool) {
    let food = seed_food(&pool, "Chelow").await;
    let plan_id = seed_plan(&pool, food.id, 50).await;

    let mut uow = assert_ok!(UnitOfWork::begin(&pool).await);
    sqlx::query("UPDATE menu_plans SET capacity = 0 WHERE id = $1")
        .bind(plan_id)
        .execute(uow.conn())
        .await
        .unwrap();
    uow.defer(DeferredEffect::PostConsumption {
        plan_id,
        capacity: 0,
    });
    drop(uow);
    assert_eq!(plan_capacity(&pool, plan_id).await, 50);

    let mut uow = assert_ok!(UnitOfWork::begin(&pool).await);
    sqlx::query("UPDATE menu_plans SET capacity = 45 WHERE id = $1")
        .bind(plan_id)
        .execute(uow.conn())
        .await
        .unwrap();
    uow.defer(DeferredEffect::PostConsumption {
        plan_id,
        capacity: 45,
    });
    uow.defer(DeferredEffect::PostConsumption {
        plan_id,
        capacity: 44,
    });

    let effects = assert_ok!(uow.commit().await);
    assert_eq!(
        effects,
        vec![
            DeferredEffect::PostConsumption {
                plan_id,
                capacity: 45
            },
            DeferredEffect::PostConsumption {
                plan_id,
                capacity: 44
            },
        ]
    );
    assert_eq!(plan_capacity(&pool, plan_id).await, 45);
}
