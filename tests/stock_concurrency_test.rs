mod common;

use chrono::Utc;
use common::TestContext;
use rust_decimal_macros::dec;
use stockledger_api::services::orders::{CreateOrderRequest, OrderItemRequest};

// Needs a real SQLite database and migrations.
// Run with: cargo test -- --ignored stock_concurrency

#[tokio::test]
#[ignore]
async fn stock_concurrency() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Energy Drink").await;
    let dsr = ctx.seed_dsr("Concurrent DSR").await;
    let route = ctx.seed_route("Bypass Road").await;
    let batch = ctx
        .seed_batch(variant.id, 10, 0, dec!(20.00), dec!(30.00))
        .await;

    // 20 single-piece orders racing for 10 pieces: exactly 10 may win.
    let mut tasks = vec![];
    for _ in 0..20 {
        let orders = ctx.services.orders.clone();
        let product_id = variant.product_id;
        let batch_id = batch.id;
        let dsr_id = dsr.id;
        let route_id = route.id;
        tasks.push(tokio::spawn(async move {
            orders
                .create_order(CreateOrderRequest {
                    dsr_id,
                    route_id,
                    order_date: Utc::now(),
                    items: vec![OrderItemRequest {
                        product_id,
                        batch_id,
                        quantity: 1,
                        unit: "PCS".to_string(),
                        free_quantity: 0,
                        extra_pieces: 0,
                        sale_price: dec!(30.00),
                        discount: dec!(0.00),
                    }],
                })
                .await
                .is_ok()
        }));
    }

    let mut success = 0;
    for t in tasks {
        if t.await.unwrap_or(false) {
            success += 1;
        }
    }
    assert_eq!(
        success, 10,
        "exactly 10 reservations should succeed; got {}",
        success
    );

    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 0);
}
