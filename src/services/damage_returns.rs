use crate::{
    audit::{AuditSink, AuditValue},
    db::DbPool,
    entities::{
        damage_return::{self, DamageReturnStatus, Entity as DamageReturnEntity},
        damage_return_item::{self, Entity as DamageReturnItemEntity, ItemCondition},
        product_variant::Entity as VariantEntity,
        stock_adjustment::AdjustmentType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{stock_adjustments, stock_batches},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Creation is retried this many times when two same-day returns race for
/// the same sequence number; the unique constraint on `return_number`
/// turns the loser's insert into a retriable conflict.
const RETURN_NUMBER_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DamageReturnItemRequest {
    pub variant_id: Uuid,
    pub batch_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Used only when no batch is linked; a linked batch's supplier price
    /// always wins.
    pub unit_price: Decimal,
    pub condition: ItemCondition,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateDamageReturnRequest {
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<DamageReturnItemRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DamageReturnResponse {
    pub damage_return: damage_return::Model,
    pub items: Vec<damage_return_item::Model>,
}

/// Standalone return workflow: `pending -> {approved, rejected}`, both
/// terminal. Approval restocks resellable batch-linked lines through the
/// stock adjustment recorder.
#[derive(Clone)]
pub struct DamageReturnService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<AuditSink>,
}

impl DamageReturnService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, audit: Arc<AuditSink>) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create(
        &self,
        request: CreateDamageReturnRequest,
    ) -> Result<DamageReturnResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
            if item.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Unit price must not be negative".to_string(),
                ));
            }
        }

        let db = self.db_pool.as_ref();

        let mut last_err = None;
        for attempt in 1..=RETURN_NUMBER_ATTEMPTS {
            let notes = request.notes.clone();
            let items = request.items.clone();

            let result = db
                .transaction::<_, damage_return::Model, ServiceError>(move |txn| {
                    Box::pin(async move { insert_return(txn, notes, &items).await })
                })
                .await
                .map_err(stock_batches::map_txn_err);

            match result {
                Ok(created) => {
                    info!(
                        return_id = %created.id,
                        return_number = %created.return_number,
                        "Damage return created"
                    );
                    if let Err(e) = self
                        .event_sender
                        .send(Event::DamageReturnCreated(created.id))
                        .await
                    {
                        warn!(return_id = %created.id, error = %e, "Failed to send damage return created event");
                    }
                    self.audit.log(
                        "create",
                        "damage_return",
                        created.id,
                        &created.return_number,
                        None,
                        Some(AuditValue::from_damage_return(&created)),
                    );
                    return self.get(created.id).await;
                }
                Err(e) if is_unique_violation(&e) && attempt < RETURN_NUMBER_ATTEMPTS => {
                    warn!(attempt, "Return number collision, retrying");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ServiceError::Conflict("Could not allocate a return number".to_string())
        }))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, return_id: Uuid) -> Result<DamageReturnResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        let damage_return = DamageReturnEntity::find_by_id(return_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Damage return {} not found", return_id))
            })?;

        let items = damage_return
            .find_related(DamageReturnItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DamageReturnResponse {
            damage_return,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<damage_return::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let paginator = DamageReturnEntity::find()
            .order_by_desc(damage_return::Column::CreatedAt)
            .paginate(db, limit);
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

    /// Approves a pending return. Resellable batch-linked lines re-enter
    /// sellable stock; damaged lines are written off with no stock change.
    #[instrument(skip(self), fields(return_id = %return_id))]
    pub async fn approve(
        &self,
        return_id: Uuid,
        approved_by: Uuid,
    ) -> Result<DamageReturnResponse, ServiceError> {
        let db = self.db_pool.as_ref();
        let before = self.get(return_id).await?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let header = load_pending(txn, return_id, "approve").await?;

                let items = DamageReturnItemEntity::find()
                    .filter(damage_return_item::Column::DamageReturnId.eq(return_id))
                    .all(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                for item in &items {
                    let condition =
                        ItemCondition::from_str(&item.condition).map_err(|_| {
                            ServiceError::InternalError(format!(
                                "Unknown item condition: {}",
                                item.condition
                            ))
                        })?;
                    if condition == ItemCondition::Resellable {
                        if let Some(batch_id) = item.batch_id {
                            stock_adjustments::record_in_txn(
                                txn,
                                crate::services::stock_adjustments::RecordAdjustmentRequest {
                                    variant_id: item.variant_id,
                                    batch_id: Some(batch_id),
                                    adjustment_type: AdjustmentType::ReturnRestock,
                                    quantity: item.quantity,
                                    free_quantity: 0,
                                    order_id: None,
                                    return_id: Some(return_id),
                                    note: None,
                                },
                            )
                            .await?;
                        }
                    }
                }

                let mut active: damage_return::ActiveModel = header.into();
                active.status = Set(DamageReturnStatus::Approved.to_string());
                active.approved_at = Set(Some(Utc::now()));
                active.approved_by = Set(Some(approved_by));
                active.update(txn).await.map_err(ServiceError::db_error)?;

                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(return_id = %return_id, "Damage return approved");

        if let Err(e) = self
            .event_sender
            .send(Event::DamageReturnApproved(return_id))
            .await
        {
            warn!(return_id = %return_id, error = %e, "Failed to send damage return approved event");
        }

        let response = self.get(return_id).await?;
        self.audit.log(
            "approve",
            "damage_return",
            return_id,
            &response.damage_return.return_number,
            Some(AuditValue::from_damage_return(&before.damage_return)),
            Some(AuditValue::from_damage_return(&response.damage_return)),
        );
        Ok(response)
    }

    /// Rejects a pending return; no stock effect.
    #[instrument(skip(self), fields(return_id = %return_id))]
    pub async fn reject(&self, return_id: Uuid) -> Result<DamageReturnResponse, ServiceError> {
        let db = self.db_pool.as_ref();
        let before = self.get(return_id).await?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let header = load_pending(txn, return_id, "reject").await?;
                let mut active: damage_return::ActiveModel = header.into();
                active.status = Set(DamageReturnStatus::Rejected.to_string());
                active.update(txn).await.map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(return_id = %return_id, "Damage return rejected");

        if let Err(e) = self
            .event_sender
            .send(Event::DamageReturnRejected(return_id))
            .await
        {
            warn!(return_id = %return_id, error = %e, "Failed to send damage return rejected event");
        }

        let response = self.get(return_id).await?;
        self.audit.log(
            "reject",
            "damage_return",
            return_id,
            &response.damage_return.return_number,
            Some(AuditValue::from_damage_return(&before.damage_return)),
            Some(AuditValue::from_damage_return(&response.damage_return)),
        );
        Ok(response)
    }

    /// Deletes a return; legal only while pending.
    #[instrument(skip(self), fields(return_id = %return_id))]
    pub async fn delete(&self, return_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let before = self.get(return_id).await?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let header = load_pending(txn, return_id, "delete").await?;

                DamageReturnItemEntity::delete_many()
                    .filter(damage_return_item::Column::DamageReturnId.eq(return_id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                header.delete(txn).await.map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(return_id = %return_id, "Damage return deleted");

        if let Err(e) = self
            .event_sender
            .send(Event::DamageReturnDeleted(return_id))
            .await
        {
            warn!(return_id = %return_id, error = %e, "Failed to send damage return deleted event");
        }

        self.audit.log(
            "delete",
            "damage_return",
            return_id,
            &before.damage_return.return_number,
            Some(AuditValue::from_damage_return(&before.damage_return)),
            None,
        );
        Ok(())
    }
}

/// Loads a return for update, enforcing that it is still pending.
/// Both `approved` and `rejected` are terminal.
async fn load_pending(
    txn: &DatabaseTransaction,
    return_id: Uuid,
    action: &str,
) -> Result<damage_return::Model, ServiceError> {
    let header = DamageReturnEntity::find_by_id(return_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Damage return {} not found", return_id)))?;

    if header.status != DamageReturnStatus::Pending.to_string() {
        return Err(ServiceError::InvalidStateTransition(format!(
            "Cannot {} damage return {}: status is {}",
            action, header.return_number, header.status
        )));
    }
    Ok(header)
}

async fn insert_return(
    txn: &DatabaseTransaction,
    notes: Option<String>,
    items: &[DamageReturnItemRequest],
) -> Result<damage_return::Model, ServiceError> {
    let now = Utc::now();
    let return_id = Uuid::new_v4();
    let return_number = next_return_number(txn, now).await?;

    let mut total = Decimal::ZERO;
    let mut rows = Vec::with_capacity(items.len());

    for item in items {
        let variant = VariantEntity::find_by_id(item.variant_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", item.variant_id))
            })?;

        // Batch-linked lines are valued at the batch's supplier price;
        // the caller-supplied price only covers unlinked lines.
        let unit_price = match item.batch_id {
            Some(batch_id) => {
                let batch = stock_batches::load_batch_for_update(txn, batch_id).await?;
                stock_batches::check_batch_ownership(&batch, &variant)?;
                batch.supplier_price
            }
            None => item.unit_price.round_dp(2),
        };

        total += (unit_price * Decimal::from(item.quantity)).round_dp(2);
        rows.push(damage_return_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            damage_return_id: Set(return_id),
            variant_id: Set(item.variant_id),
            batch_id: Set(item.batch_id),
            quantity: Set(item.quantity),
            unit_price: Set(unit_price),
            condition: Set(item.condition.to_string()),
        });
    }

    let created = damage_return::ActiveModel {
        id: Set(return_id),
        return_number: Set(return_number),
        status: Set(DamageReturnStatus::Pending.to_string()),
        total_amount: Set(total.round_dp(2)),
        notes: Set(notes),
        created_at: Set(now),
        approved_at: Set(None),
        approved_by: Set(None),
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)?;

    for row in rows {
        row.insert(txn).await.map_err(ServiceError::db_error)?;
    }

    Ok(created)
}

/// `RET-YYYYMMDD-NNNN` where NNNN is the count of returns already dated
/// that day plus one. The unique constraint plus the caller's retry loop
/// closes the count-then-append race window.
async fn next_return_number(
    txn: &DatabaseTransaction,
    now: chrono::DateTime<Utc>,
) -> Result<String, ServiceError> {
    let prefix = format!("RET-{}-", now.format("%Y%m%d"));

    let same_day = DamageReturnEntity::find()
        .filter(damage_return::Column::ReturnNumber.starts_with(prefix.clone()))
        .count(txn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(format!("{}{:04}", prefix, same_day + 1))
}

fn is_unique_violation(err: &ServiceError) -> bool {
    match err {
        ServiceError::DatabaseError(DbErr::Exec(e)) => {
            let msg = e.to_string().to_lowercase();
            msg.contains("unique") || msg.contains("duplicate")
        }
        ServiceError::DatabaseError(DbErr::Query(e)) => {
            let msg = e.to_string().to_lowercase();
            msg.contains("unique") || msg.contains("duplicate")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_request_requires_items() {
        let req = CreateDamageReturnRequest {
            notes: None,
            items: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn item_quantity_must_be_positive() {
        let item = DamageReturnItemRequest {
            variant_id: Uuid::new_v4(),
            batch_id: None,
            quantity: 0,
            unit_price: dec!(4.00),
            condition: ItemCondition::Damaged,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn condition_round_trips() {
        assert_eq!(ItemCondition::Resellable.to_string(), "resellable");
        assert_eq!(
            ItemCondition::from_str("damaged").unwrap(),
            ItemCondition::Damaged
        );
    }
}
