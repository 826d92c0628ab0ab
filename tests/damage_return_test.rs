mod common;

use chrono::Utc;
use common::TestContext;
use rust_decimal_macros::dec;
use stockledger_api::entities::damage_return_item::ItemCondition;
use stockledger_api::errors::ServiceError;
use stockledger_api::services::damage_returns::{
    CreateDamageReturnRequest, DamageReturnItemRequest,
};
use uuid::Uuid;

// These tests need a SQLite database with migrations applied.
// Run with: cargo test -- --ignored

#[tokio::test]
#[ignore]
async fn return_numbers_are_daily_sequences_and_totals_use_supplier_price() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Shampoo Sachet").await;
    let batch = ctx
        .seed_batch(variant.id, 40, 0, dec!(2.50), dec!(4.00))
        .await;

    let first = ctx
        .services
        .damage_returns
        .create(CreateDamageReturnRequest {
            notes: Some("van crate crushed".to_string()),
            items: vec![DamageReturnItemRequest {
                variant_id: variant.id,
                batch_id: Some(batch.id),
                quantity: 6,
                // Ignored for batch-linked lines.
                unit_price: dec!(99.00),
                condition: ItemCondition::Damaged,
            }],
        })
        .await
        .expect("create return");

    let today = Utc::now().format("%Y%m%d").to_string();
    assert_eq!(
        first.damage_return.return_number,
        format!("RET-{}-0001", today)
    );
    assert_eq!(first.damage_return.total_amount, dec!(15.00));
    assert_eq!(first.damage_return.status, "pending");
    assert_eq!(first.items[0].unit_price, dec!(2.50));

    let second = ctx
        .services
        .damage_returns
        .create(CreateDamageReturnRequest {
            notes: None,
            items: vec![DamageReturnItemRequest {
                variant_id: variant.id,
                batch_id: None,
                quantity: 2,
                unit_price: dec!(3.00),
                condition: ItemCondition::Damaged,
            }],
        })
        .await
        .expect("create second return");
    assert_eq!(
        second.damage_return.return_number,
        format!("RET-{}-0002", today)
    );
}

#[tokio::test]
#[ignore]
async fn approval_restocks_only_resellable_batch_linked_lines() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Noodles Pack").await;
    let batch = ctx
        .seed_batch(variant.id, 30, 0, dec!(5.00), dec!(8.00))
        .await;

    let created = ctx
        .services
        .damage_returns
        .create(CreateDamageReturnRequest {
            notes: None,
            items: vec![
                DamageReturnItemRequest {
                    variant_id: variant.id,
                    batch_id: Some(batch.id),
                    quantity: 4,
                    unit_price: dec!(0.00),
                    condition: ItemCondition::Resellable,
                },
                DamageReturnItemRequest {
                    variant_id: variant.id,
                    batch_id: Some(batch.id),
                    quantity: 9,
                    unit_price: dec!(0.00),
                    condition: ItemCondition::Damaged,
                },
            ],
        })
        .await
        .expect("create return");

    let approver = Uuid::new_v4();
    let approved = ctx
        .services
        .damage_returns
        .approve(created.damage_return.id, approver)
        .await
        .expect("approve");
    assert_eq!(approved.damage_return.status, "approved");
    assert_eq!(approved.damage_return.approved_by, Some(approver));
    assert!(approved.damage_return.approved_at.is_some());

    // Only the 4 resellable pieces come back. The batch was still full,
    // so the restock grows the intake figure alongside.
    let after = ctx.reload_batch(batch.id).await;
    assert_eq!(after.remaining_quantity, 34);
    assert_eq!(after.initial_quantity, 34);
}

#[tokio::test]
#[ignore]
async fn terminal_states_reject_further_transitions() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Candy Jar").await;

    let created = ctx
        .services
        .damage_returns
        .create(CreateDamageReturnRequest {
            notes: None,
            items: vec![DamageReturnItemRequest {
                variant_id: variant.id,
                batch_id: None,
                quantity: 1,
                unit_price: dec!(10.00),
                condition: ItemCondition::Damaged,
            }],
        })
        .await
        .expect("create return");
    let id = created.damage_return.id;

    ctx.services
        .damage_returns
        .reject(id)
        .await
        .expect("reject pending");

    for result in [
        ctx.services.damage_returns.approve(id, Uuid::new_v4()).await.err(),
        ctx.services.damage_returns.reject(id).await.err(),
        ctx.services.damage_returns.delete(id).await.err(),
    ] {
        match result {
            Some(ServiceError::InvalidStateTransition(_)) => {}
            other => panic!("expected InvalidStateTransition, got {other:?}"),
        }
    }
}

#[tokio::test]
#[ignore]
async fn pending_returns_can_be_deleted() {
    let ctx = TestContext::new().await;
    let variant = ctx.seed_variant("Matchbox").await;

    let created = ctx
        .services
        .damage_returns
        .create(CreateDamageReturnRequest {
            notes: None,
            items: vec![DamageReturnItemRequest {
                variant_id: variant.id,
                batch_id: None,
                quantity: 3,
                unit_price: dec!(1.00),
                condition: ItemCondition::Damaged,
            }],
        })
        .await
        .expect("create return");

    ctx.services
        .damage_returns
        .delete(created.damage_return.id)
        .await
        .expect("delete pending");

    let err = ctx
        .services
        .damage_returns
        .get(created.damage_return.id)
        .await
        .expect_err("deleted return should be gone");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
