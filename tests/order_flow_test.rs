mod common;

use chrono::Utc;
use common::TestContext;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use stockledger_api::entities::order;
use stockledger_api::errors::ServiceError;
use stockledger_api::services::orders::{CreateOrderRequest, OrderItemRequest, UpdateOrderRequest};
use uuid::Uuid;

// These tests need a SQLite database with migrations applied.
// Run with: cargo test -- --ignored

fn line(
    product_id: Uuid,
    batch_id: Uuid,
    quantity: i32,
    unit: &str,
    free_quantity: i32,
    extra_pieces: i32,
) -> OrderItemRequest {
    OrderItemRequest {
        product_id,
        batch_id,
        quantity,
        unit: unit.to_string(),
        free_quantity,
        extra_pieces,
        sale_price: dec!(10.00),
        discount: dec!(5.00),
    }
}

#[tokio::test]
#[ignore]
async fn box_order_computes_line_totals_and_draws_down_the_batch() {
    let ctx = TestContext::new().await;
    ctx.seed_unit("BOX", 12).await;
    let variant = ctx.seed_variant("Cola 250ml").await;
    let dsr = ctx.seed_dsr("Rahim").await;
    let route = ctx.seed_route("North Market").await;
    let batch = ctx
        .seed_batch(variant.id, 100, 10, dec!(7.00), dec!(10.00))
        .await;

    let order = ctx
        .services
        .orders
        .create_order(CreateOrderRequest {
            dsr_id: dsr.id,
            route_id: route.id,
            order_date: Utc::now(),
            items: vec![line(variant.product_id, batch.id, 5, "BOX", 3, 2)],
        })
        .await
        .expect("create order");

    // 5 boxes of 12 plus 2 extras = 62 paid pieces at 10.00, minus 5.00.
    let item = &order.items[0].item;
    assert_eq!(item.subtotal, dec!(620.00));
    assert_eq!(item.net, dec!(615.00));
    assert_eq!(item.total_quantity, 65);
    assert_eq!(order.order.subtotal, dec!(620.00));
    assert_eq!(order.order.total, dec!(615.00));
    assert!(order.order.order_number.starts_with("WO-"));

    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 35);
    assert_eq!(after.remaining_free_qty, 7);
}

#[tokio::test]
#[ignore]
async fn over_reservation_fails_and_leaves_the_batch_untouched() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Chips 30g").await;
    let dsr = ctx.seed_dsr("Karim").await;
    let route = ctx.seed_route("South Market").await;
    let batch = ctx.seed_batch(variant.id, 10, 0, dec!(4.00), dec!(6.00)).await;

    let err = ctx
        .services
        .orders
        .create_order(CreateOrderRequest {
            dsr_id: dsr.id,
            route_id: route.id,
            order_date: Utc::now(),
            items: vec![line(variant.product_id, batch.id, 50, "PCS", 0, 0)],
        })
        .await
        .expect_err("should not allocate");

    match err {
        ServiceError::InsufficientStock {
            requested,
            available,
        } => {
            assert_eq!(requested, 50);
            assert_eq!(available, 10);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 10);
    assert_eq!(after.remaining_free_qty, 0);
}

#[tokio::test]
#[ignore]
async fn order_against_a_batch_of_another_product_is_rejected() {
    let ctx = TestContext::new().await;
    let variant_a = ctx.seed_variant("Soap Bar").await;
    let variant_b = ctx.seed_variant("Detergent 1kg").await;
    let dsr = ctx.seed_dsr("Jamal").await;
    let route = ctx.seed_route("East Market").await;
    let batch_b = ctx
        .seed_batch(variant_b.id, 20, 0, dec!(3.00), dec!(5.00))
        .await;

    let err = ctx
        .services
        .orders
        .create_order(CreateOrderRequest {
            dsr_id: dsr.id,
            route_id: route.id,
            order_date: Utc::now(),
            items: vec![line(variant_a.product_id, batch_b.id, 1, "PCS", 0, 0)],
        })
        .await
        .expect_err("cross-product batch must fail");

    assert!(matches!(err, ServiceError::OwnershipMismatch(_)));
}

#[tokio::test]
#[ignore]
async fn order_numbers_are_sequential_within_a_year() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Biscuit Pack").await;
    let dsr = ctx.seed_dsr("Hasan").await;
    let route = ctx.seed_route("West Market").await;
    let batch = ctx
        .seed_batch(variant.id, 100, 0, dec!(2.00), dec!(3.00))
        .await;

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let order = ctx
            .services
            .orders
            .create_order(CreateOrderRequest {
                dsr_id: dsr.id,
                route_id: route.id,
                order_date: Utc::now(),
                items: vec![line(variant.product_id, batch.id, 1, "PCS", 0, 0)],
            })
            .await
            .expect("create order");
        numbers.push(order.order.order_number);
    }

    let year = Utc::now().format("%Y").to_string();
    assert_eq!(numbers[0], format!("WO-{}-0001", year));
    assert_eq!(numbers[1], format!("WO-{}-0002", year));
}

#[tokio::test]
#[ignore]
async fn order_numbers_keep_counting_past_four_digits() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Soap Bar").await;
    let dsr = ctx.seed_dsr("Kamal").await;
    let route = ctx.seed_route("East Market").await;
    let batch = ctx
        .seed_batch(variant.id, 100, 0, dec!(2.00), dec!(3.00))
        .await;

    // A busy year: the zero-padded suffix has already outgrown its width.
    let year = Utc::now().format("%Y").to_string();
    for suffix in ["9999", "10000"] {
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(format!("WO-{}-{}", year, suffix)),
            dsr_id: Set(dsr.id),
            route_id: Set(route.id),
            order_date: Set(Utc::now()),
            subtotal: Set(dec!(0.00)),
            discount: Set(dec!(0.00)),
            total: Set(dec!(0.00)),
            paid_amount: Set(dec!(0.00)),
            payment_status: Set("unpaid".to_string()),
            status: Set("pending".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(ctx.db.as_ref())
        .await
        .expect("seed order row");
    }

    let order = ctx
        .services
        .orders
        .create_order(CreateOrderRequest {
            dsr_id: dsr.id,
            route_id: route.id,
            order_date: Utc::now(),
            items: vec![line(variant.product_id, batch.id, 1, "PCS", 0, 0)],
        })
        .await
        .expect("create order");

    assert_eq!(order.order.order_number, format!("WO-{}-10001", year));
}

#[tokio::test]
#[ignore]
async fn update_order_restores_prior_reservations_before_reallocating() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Milk 500ml").await;
    let dsr = ctx.seed_dsr("Rafiq").await;
    let route = ctx.seed_route("River Road").await;
    let batch = ctx
        .seed_batch(variant.id, 50, 5, dec!(5.00), dec!(8.00))
        .await;

    let order = ctx
        .services
        .orders
        .create_order(CreateOrderRequest {
            dsr_id: dsr.id,
            route_id: route.id,
            order_date: Utc::now(),
            items: vec![line(variant.product_id, batch.id, 30, "PCS", 5, 0)],
        })
        .await
        .expect("create order");
    // 30 paid + 5 free reserved.
    let mid = ctx.reload_batch(batch.id).await;
    assert_eq!(mid.remaining_quantity, 15);
    assert_eq!(mid.remaining_free_qty, 0);

    ctx.services
        .orders
        .update_order(
            order.order.id,
            UpdateOrderRequest {
                order_date: None,
                items: vec![line(variant.product_id, batch.id, 10, "PCS", 2, 0)],
            },
        )
        .await
        .expect("update order");

    // Only the replacement reservation remains: 10 paid + 2 free.
    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 38);
    assert_eq!(after.remaining_free_qty, 3);
}

#[tokio::test]
#[ignore]
async fn delete_order_returns_everything_to_the_batch() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Tea 100g").await;
    let dsr = ctx.seed_dsr("Selim").await;
    let route = ctx.seed_route("Hill Track").await;
    let batch = ctx
        .seed_batch(variant.id, 40, 4, dec!(6.00), dec!(9.00))
        .await;

    let order = ctx
        .services
        .orders
        .create_order(CreateOrderRequest {
            dsr_id: dsr.id,
            route_id: route.id,
            order_date: Utc::now(),
            items: vec![line(variant.product_id, batch.id, 12, "PCS", 4, 0)],
        })
        .await
        .expect("create order");

    ctx.services
        .orders
        .delete_order(order.order.id)
        .await
        .expect("delete order");

    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 40);
    assert_eq!(after.remaining_free_qty, 4);

    let err = ctx
        .services
        .orders
        .get_order(order.order.id)
        .await
        .expect_err("deleted order should be gone");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
