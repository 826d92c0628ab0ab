mod common;

use common::TestContext;
use rust_decimal_macros::dec;
use stockledger_api::entities::stock_adjustment::AdjustmentType;
use stockledger_api::errors::ServiceError;
use stockledger_api::services::stock_adjustments::RecordAdjustmentRequest;

// These tests need a SQLite database with migrations applied.
// Run with: cargo test -- --ignored

#[tokio::test]
#[ignore]
async fn manual_correction_cannot_exceed_the_intake() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Tea Box").await;
    let batch = ctx
        .seed_batch(variant.id, 20, 0, dec!(3.00), dec!(5.00))
        .await;

    let err = ctx
        .services
        .stock_adjustments
        .record(RecordAdjustmentRequest {
            variant_id: variant.id,
            batch_id: Some(batch.id),
            adjustment_type: AdjustmentType::Manual,
            quantity: 5,
            free_quantity: 0,
            order_id: None,
            return_id: None,
            note: Some("recount".to_string()),
        })
        .await
        .expect_err("full batch cannot be topped up manually");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    // Nothing moved, nothing logged against the batch.
    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 20);
    assert_eq!(after.initial_quantity, 20);
}

#[tokio::test]
#[ignore]
async fn return_restock_grows_a_full_batch() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Tea Box").await;
    let batch = ctx
        .seed_batch(variant.id, 20, 0, dec!(3.00), dec!(5.00))
        .await;

    ctx.services
        .stock_adjustments
        .record(RecordAdjustmentRequest {
            variant_id: variant.id,
            batch_id: Some(batch.id),
            adjustment_type: AdjustmentType::ReturnRestock,
            quantity: 6,
            free_quantity: 0,
            order_id: None,
            return_id: None,
            note: None,
        })
        .await
        .expect("restock past the intake");

    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 26);
    assert_eq!(after.initial_quantity, 26);
}
