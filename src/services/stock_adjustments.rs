use crate::{
    audit::{AuditSink, AuditValue},
    db::DbPool,
    entities::{
        product_variant::Entity as VariantEntity,
        stock_adjustment::{self, AdjustmentType, Entity as StockAdjustmentEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock_batches,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAdjustmentRequest {
    pub variant_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub adjustment_type: AdjustmentType,
    /// Signed delta against the batch's remaining paid quantity.
    pub quantity: i32,
    /// Signed delta against the batch's remaining free quantity.
    pub free_quantity: i32,
    pub order_id: Option<Uuid>,
    pub return_id: Option<Uuid>,
    pub note: Option<String>,
}

/// The only sanctioned path for out-of-band stock changes: damage
/// write-offs, manual corrections, and return restocking. Every batch
/// mutation it performs lands with exactly one log row in the same
/// transaction.
#[derive(Clone)]
pub struct StockAdjustmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<AuditSink>,
}

impl StockAdjustmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, audit: Arc<AuditSink>) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    /// Records an adjustment, mutating the batch (if any) and writing the
    /// log entry in one transaction.
    #[instrument(skip(self, request), fields(variant_id = %request.variant_id, adjustment_type = %request.adjustment_type))]
    pub async fn record(
        &self,
        request: RecordAdjustmentRequest,
    ) -> Result<stock_adjustment::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let req = request.clone();

        let adjustment = db
            .transaction::<_, stock_adjustment::Model, ServiceError>(move |txn| {
                Box::pin(async move { record_in_txn(txn, req).await })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(
            adjustment_id = %adjustment.id,
            variant_id = %adjustment.variant_id,
            quantity = adjustment.quantity,
            free_quantity = adjustment.free_quantity,
            "Stock adjustment recorded"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::StockAdjusted {
                adjustment_id: adjustment.id,
                variant_id: adjustment.variant_id,
                batch_id: adjustment.batch_id,
                quantity: adjustment.quantity,
                free_quantity: adjustment.free_quantity,
            })
            .await
        {
            warn!(adjustment_id = %adjustment.id, error = %e, "Failed to send stock adjusted event");
        }

        self.audit.log(
            "record",
            "stock_adjustment",
            adjustment.id,
            &adjustment.adjustment_type,
            None,
            Some(AuditValue::from_adjustment(&adjustment)),
        );

        Ok(adjustment)
    }

    /// Fetches a single adjustment.
    #[instrument(skip(self))]
    pub async fn get(&self, adjustment_id: Uuid) -> Result<stock_adjustment::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        StockAdjustmentEntity::find_by_id(adjustment_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock adjustment {} not found", adjustment_id))
            })
    }

    /// Lists adjustments, optionally for one variant, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        variant_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_adjustment::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query =
            StockAdjustmentEntity::find().order_by_desc(stock_adjustment::Column::CreatedAt);
        if let Some(variant_id) = variant_id {
            query = query.filter(stock_adjustment::Column::VariantId.eq(variant_id));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((rows, total))
    }
}

/// Adjustment body shared with callers already inside a transaction
/// (damage-return approval, settlement restocks).
pub(crate) async fn record_in_txn<C: ConnectionTrait>(
    txn: &C,
    request: RecordAdjustmentRequest,
) -> Result<stock_adjustment::Model, ServiceError> {
    let variant = VariantEntity::find_by_id(request.variant_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Variant {} not found", request.variant_id))
        })?;

    if let Some(batch_id) = request.batch_id {
        let batch = stock_batches::load_batch_for_update(txn, batch_id).await?;
        stock_batches::check_batch_ownership(&batch, &variant)?;
        // Restocked returns are standalone and may put back more than the
        // batch has room for; everything else stays within the intake.
        let overfill = match request.adjustment_type {
            AdjustmentType::ReturnRestock => stock_batches::Overfill::GrowInitial,
            AdjustmentType::Damage | AdjustmentType::Manual => stock_batches::Overfill::Reject,
        };
        stock_batches::adjust_in_txn(
            txn,
            batch_id,
            request.quantity,
            request.free_quantity,
            overfill,
        )
        .await?;
    }

    stock_adjustment::ActiveModel {
        id: Set(Uuid::new_v4()),
        variant_id: Set(request.variant_id),
        batch_id: Set(request.batch_id),
        adjustment_type: Set(request.adjustment_type.to_string()),
        quantity: Set(request.quantity),
        free_quantity: Set(request.free_quantity),
        order_id: Set(request.order_id),
        return_id: Set(request.return_id),
        note: Set(request.note),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)
}
