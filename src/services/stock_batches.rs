use crate::{
    audit::{AuditSink, AuditValue},
    db::DbPool,
    entities::{
        product_variant::{self, Entity as VariantEntity},
        stock_batch::{self, Entity as StockBatchEntity},
        supplier_purchase,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBatchRequest {
    pub variant_id: Uuid,
    #[validate(length(min = 1, message = "Supplier name is required"))]
    pub supplier_name: String,
    pub supplier_price: Decimal,
    pub sell_price: Decimal,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    pub free_quantity: i32,
}

/// Service owning the per-variant ledger of purchase lots.
///
/// Batch quantities change through exactly three paths: `reserve_in_txn`
/// (order allocation), `adjust_in_txn` (stock adjustments and restocks),
/// and intake. All three run inside their caller's transaction.
#[derive(Clone)]
pub struct StockBatchService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<AuditSink>,
}

impl StockBatchService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, audit: Arc<AuditSink>) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    /// Stock intake: creates the batch and its supplier-purchase ledger
    /// entry in one transaction.
    #[instrument(skip(self, request), fields(variant_id = %request.variant_id))]
    pub async fn create_batch(
        &self,
        request: CreateBatchRequest,
    ) -> Result<stock_batch::Model, ServiceError> {
        request.validate()?;
        if request.supplier_price < Decimal::ZERO || request.sell_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Prices must not be negative".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let batch = db
            .transaction::<_, stock_batch::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let variant = VariantEntity::find_by_id(request.variant_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Variant {} not found",
                                request.variant_id
                            ))
                        })?;

                    let now = Utc::now();
                    let batch_id = Uuid::new_v4();
                    let total_cost = (request.supplier_price * Decimal::from(request.quantity))
                        .round_dp(2);

                    let batch = stock_batch::ActiveModel {
                        id: Set(batch_id),
                        variant_id: Set(variant.id),
                        supplier_price: Set(request.supplier_price.round_dp(2)),
                        sell_price: Set(request.sell_price.round_dp(2)),
                        initial_quantity: Set(request.quantity),
                        remaining_quantity: Set(request.quantity),
                        initial_free_qty: Set(request.free_quantity),
                        remaining_free_qty: Set(request.free_quantity),
                        received_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    supplier_purchase::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        batch_id: Set(batch_id),
                        variant_id: Set(variant.id),
                        supplier_name: Set(request.supplier_name.clone()),
                        quantity: Set(request.quantity),
                        free_quantity: Set(request.free_quantity),
                        unit_cost: Set(request.supplier_price.round_dp(2)),
                        total_cost: Set(total_cost),
                        purchased_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(batch)
                })
            })
            .await
            .map_err(map_txn_err)?;

        info!(
            batch_id = %batch.id,
            variant_id = %batch.variant_id,
            quantity = batch.initial_quantity,
            free_quantity = batch.initial_free_qty,
            "Stock batch received"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::StockBatchCreated {
                batch_id: batch.id,
                variant_id: batch.variant_id,
                quantity: batch.initial_quantity,
                free_quantity: batch.initial_free_qty,
            })
            .await
        {
            warn!(batch_id = %batch.id, error = %e, "Failed to send stock batch created event");
        }

        self.audit.log(
            "create",
            "stock_batch",
            batch.id,
            &batch.id.to_string(),
            None,
            Some(AuditValue::from_batch(&batch)),
        );

        Ok(batch)
    }

    /// Fetches a batch by id.
    #[instrument(skip(self))]
    pub async fn get_batch(&self, batch_id: Uuid) -> Result<stock_batch::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        StockBatchEntity::find_by_id(batch_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))
    }

    /// Lists batches, optionally restricted to one variant, newest first.
    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        variant_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_batch::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = StockBatchEntity::find().order_by_desc(stock_batch::Column::ReceivedAt);
        if let Some(variant_id) = variant_id {
            query = query.filter(stock_batch::Column::VariantId.eq(variant_id));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count stock batches");
            ServiceError::db_error(e)
        })?;
        let batches = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((batches, total))
    }
}

/// Maps a sea-orm transaction error back to the service error raised
/// inside the closure.
pub(crate) fn map_txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

/// Loads a batch for update, taking a row lock so concurrent sufficiency
/// checks against the same lot serialize.
pub(crate) async fn load_batch_for_update<C: ConnectionTrait>(
    txn: &C,
    batch_id: Uuid,
) -> Result<stock_batch::Model, ServiceError> {
    StockBatchEntity::find_by_id(batch_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))
}

/// Reserves stock from a batch inside the caller's transaction.
///
/// `qty` is the line's combined paid+free total quantity and `free_qty`
/// its free portion; both are checked against the matching remaining
/// field and subtracted together. Fails `InsufficientStock` without
/// touching the row.
pub(crate) async fn reserve_in_txn<C: ConnectionTrait>(
    txn: &C,
    batch_id: Uuid,
    qty: i32,
    free_qty: i32,
) -> Result<stock_batch::Model, ServiceError> {
    debug_assert!(qty >= 0 && free_qty >= 0);

    let batch = load_batch_for_update(txn, batch_id).await?;

    if batch.remaining_quantity < qty {
        return Err(ServiceError::insufficient_stock(
            qty,
            batch.remaining_quantity,
        ));
    }
    if batch.remaining_free_qty < free_qty {
        return Err(ServiceError::insufficient_stock(
            free_qty,
            batch.remaining_free_qty,
        ));
    }

    let mut active: stock_batch::ActiveModel = batch.clone().into();
    active.remaining_quantity = Set(batch.remaining_quantity - qty);
    active.remaining_free_qty = Set(batch.remaining_free_qty - free_qty);
    active.update(txn).await.map_err(ServiceError::db_error)
}

/// How an increase past the batch's initial intake is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Overfill {
    /// Reject the adjustment. Reservation releases and manual corrections
    /// can only put back what was drawn from this batch.
    Reject,
    /// Grow the initial quantities to match. Damage returns restock goods
    /// that were not necessarily drawn from this batch by a recorded
    /// order.
    GrowInitial,
}

/// Applies signed deltas to a batch inside the caller's transaction,
/// holding the batch invariant `0 <= remaining <= initial` for both the
/// paid and free fields.
pub(crate) async fn adjust_in_txn<C: ConnectionTrait>(
    txn: &C,
    batch_id: Uuid,
    delta_qty: i32,
    delta_free_qty: i32,
    overfill: Overfill,
) -> Result<stock_batch::Model, ServiceError> {
    let batch = load_batch_for_update(txn, batch_id).await?;

    let new_qty = batch.remaining_quantity + delta_qty;
    let new_free = batch.remaining_free_qty + delta_free_qty;

    if new_qty < 0 {
        return Err(ServiceError::insufficient_stock(
            -delta_qty,
            batch.remaining_quantity,
        ));
    }
    if new_free < 0 {
        return Err(ServiceError::insufficient_stock(
            -delta_free_qty,
            batch.remaining_free_qty,
        ));
    }
    if (new_qty > batch.initial_quantity || new_free > batch.initial_free_qty)
        && overfill == Overfill::Reject
    {
        return Err(ServiceError::InvalidOperation(format!(
            "Adjustment would exceed batch {} initial quantities",
            batch_id
        )));
    }

    let new_initial_qty = batch.initial_quantity.max(new_qty);
    let new_initial_free = batch.initial_free_qty.max(new_free);

    let mut active: stock_batch::ActiveModel = batch.into();
    active.remaining_quantity = Set(new_qty);
    active.remaining_free_qty = Set(new_free);
    active.initial_quantity = Set(new_initial_qty);
    active.initial_free_qty = Set(new_initial_free);
    active.update(txn).await.map_err(ServiceError::db_error)
}

/// Validates that a batch belongs to the stated variant.
pub(crate) fn check_batch_ownership(
    batch: &stock_batch::Model,
    variant: &product_variant::Model,
) -> Result<(), ServiceError> {
    if batch.variant_id != variant.id {
        return Err(ServiceError::OwnershipMismatch(format!(
            "Batch {} belongs to variant {}, not {}",
            batch.id, batch.variant_id, variant.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn variant(id: Uuid) -> product_variant::Model {
        product_variant::Model {
            id,
            product_id: Uuid::new_v4(),
            name: "500ml bottle".to_string(),
            created_at: Utc::now(),
        }
    }

    fn batch(variant_id: Uuid) -> stock_batch::Model {
        stock_batch::Model {
            id: Uuid::new_v4(),
            variant_id,
            supplier_price: dec!(8.00),
            sell_price: dec!(10.00),
            initial_quantity: 100,
            remaining_quantity: 100,
            initial_free_qty: 10,
            remaining_free_qty: 10,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn ownership_check_rejects_foreign_batch() {
        let owner = variant(Uuid::new_v4());
        let stranger = variant(Uuid::new_v4());
        let b = batch(owner.id);

        assert!(check_batch_ownership(&b, &owner).is_ok());
        assert!(matches!(
            check_batch_ownership(&b, &stranger),
            Err(ServiceError::OwnershipMismatch(_))
        ));
    }

    #[test]
    fn intake_request_validation() {
        let req = CreateBatchRequest {
            variant_id: Uuid::new_v4(),
            supplier_name: String::new(),
            supplier_price: dec!(8.00),
            sell_price: dec!(10.00),
            quantity: 10,
            free_quantity: 0,
        };
        assert!(req.validate().is_err());

        let req = CreateBatchRequest {
            supplier_name: "Acme Distributors".to_string(),
            quantity: 0,
            ..req
        };
        assert!(req.validate().is_err());
    }
}
