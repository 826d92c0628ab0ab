use crate::{
    audit::{AuditSink, AuditValue},
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_customer_due::{self, Entity as CustomerDueEntity},
        order_dsr_due::{self, Entity as DsrDueEntity},
        order_expense::{self, Entity as ExpenseEntity},
        order_item::{self, Entity as OrderItemEntity},
        order_item_return::{self, Entity as ItemReturnEntity},
        order_payment::{self, Entity as PaymentEntity},
        stock_adjustment::AdjustmentType,
        stock_batch::Entity as StockBatchEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{stock_adjustments, stock_batches},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordReturnRequest {
    pub order_item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub return_amount: Decimal,
    #[serde(default)]
    pub adjustment_discount: Decimal,
    /// When true the returned units go back into the item's batch through
    /// the adjustment ledger.
    #[serde(default)]
    pub restock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddPaymentRequest {
    pub amount: Decimal,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddExpenseRequest {
    pub amount: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCustomerDueRequest {
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddDsrDueRequest {
    pub amount: Decimal,
}

/// Everything that moved in one settlement visit, applied atomically.
/// Lines not mentioned stay open for a later pass.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PartialCompletionRequest {
    #[serde(default)]
    pub returns: Vec<RecordReturnRequest>,
    #[serde(default)]
    pub customer_dues: Vec<AddCustomerDueRequest>,
    pub dsr_due: Option<AddDsrDueRequest>,
    pub payment: Option<AddPaymentRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemProfit {
    pub order_item_id: Uuid,
    pub net: Decimal,
    pub returns: Decimal,
    pub adjustment_discounts: Decimal,
    pub profit: Decimal,
}

/// Derived reconciliation view for one order, recomputed on every read.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderSettlementView {
    pub order: order::Model,
    pub net_order_total: Decimal,
    pub total_payments: Decimal,
    pub total_expenses: Decimal,
    pub total_customer_due: Decimal,
    /// `net_order_total - total_payments - total_expenses`.
    pub computed_dsr_due: Decimal,
    /// Sum of outstanding amounts on recorded DSR-due rows.
    pub recorded_dsr_due: Decimal,
    /// `computed_dsr_due - recorded_dsr_due`; a non-zero value is a
    /// data-entry gap the caller must see, not something to paper over.
    pub dsr_due_discrepancy: Decimal,
    pub item_profits: Vec<ItemProfit>,
    pub aggregate_profit: Decimal,
    pub returns: Vec<order_item_return::Model>,
    pub payments: Vec<order_payment::Model>,
    pub expenses: Vec<order_expense::Model>,
    pub customer_dues: Vec<order_customer_due::Model>,
    pub dsr_dues: Vec<order_dsr_due::Model>,
}

/// Post-creation reconciliation: returns, dues, payments, expenses.
/// Every mutation runs in its own transaction and flips the order to
/// `adjusted`; the view side never writes.
#[derive(Clone)]
pub struct SettlementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<AuditSink>,
}

impl SettlementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, audit: Arc<AuditSink>) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn settlement(&self, order_id: Uuid) -> Result<OrderSettlementView, ServiceError> {
        let db = self.db_pool.as_ref();

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let returns = ItemReturnEntity::find()
            .filter(order_item_return::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let payments = PaymentEntity::find()
            .filter(order_payment::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let expenses = ExpenseEntity::find()
            .filter(order_expense::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let customer_dues = CustomerDueEntity::find()
            .filter(order_customer_due::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let dsr_dues = DsrDueEntity::find()
            .filter(order_dsr_due::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let view = build_view(order, &items, returns, payments, expenses, customer_dues, dsr_dues);
        Ok(view)
    }

    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn record_return(
        &self,
        order_id: Uuid,
        request: RecordReturnRequest,
    ) -> Result<order_item_return::Model, ServiceError> {
        request.validate()?;
        validate_non_negative("Return amount", request.return_amount)?;
        validate_non_negative("Adjustment discount", request.adjustment_discount)?;

        let db = self.db_pool.as_ref();
        let req = request.clone();

        let created = db
            .transaction::<_, order_item_return::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = lock_order(txn, order_id).await?;
                    let created = record_return_in_txn(txn, &order, &req).await?;
                    mark_adjusted(txn, order).await?;
                    Ok(created)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(
            order_id = %order_id,
            return_id = %created.id,
            return_amount = %created.return_amount,
            "Return recorded"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::ReturnRecorded {
                order_id,
                order_item_id: created.order_item_id,
                return_amount: created.return_amount,
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send return recorded event");
        }
        self.audit_order_change(order_id, "record_return").await;

        Ok(created)
    }

    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn add_payment(
        &self,
        order_id: Uuid,
        request: AddPaymentRequest,
    ) -> Result<order_payment::Model, ServiceError> {
        validate_positive("Payment amount", request.amount)?;

        let db = self.db_pool.as_ref();
        let req = request.clone();

        let created = db
            .transaction::<_, order_payment::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = lock_order(txn, order_id).await?;
                    let created = add_payment_in_txn(txn, &order, &req).await?;
                    Ok(created)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, amount = %created.amount, "Payment recorded");

        if let Err(e) = self
            .event_sender
            .send(Event::OrderPaymentRecorded {
                order_id,
                amount: created.amount,
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send payment recorded event");
        }
        self.audit_order_change(order_id, "add_payment").await;

        Ok(created)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_payment(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let order = lock_order(txn, order_id).await?;

                let payment = PaymentEntity::find_by_id(payment_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Payment {} not found", payment_id))
                    })?;
                if payment.order_id != order_id {
                    return Err(ServiceError::OwnershipMismatch(format!(
                        "Payment {} does not belong to order {}",
                        payment_id, order_id
                    )));
                }

                let amount = payment.amount;
                PaymentEntity::delete_by_id(payment_id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                let paid = (order.paid_amount - amount).max(Decimal::ZERO);
                apply_paid_amount(txn, order, paid).await?;
                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, payment_id = %payment_id, "Payment deleted");
        self.audit_order_change(order_id, "delete_payment").await;
        Ok(())
    }

    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn add_expense(
        &self,
        order_id: Uuid,
        request: AddExpenseRequest,
    ) -> Result<order_expense::Model, ServiceError> {
        validate_positive("Expense amount", request.amount)?;

        let db = self.db_pool.as_ref();
        let req = request.clone();

        let created = db
            .transaction::<_, order_expense::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = lock_order(txn, order_id).await?;
                    let created = order_expense::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(order_id),
                        amount: Set(req.amount.round_dp(2)),
                        reason: Set(req.reason.clone()),
                        recorded_at: Set(Utc::now()),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                    mark_adjusted(txn, order).await?;
                    Ok(created)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, amount = %created.amount, "Expense recorded");

        if let Err(e) = self
            .event_sender
            .send(Event::ExpenseRecorded {
                order_id,
                amount: created.amount,
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send expense recorded event");
        }
        self.audit_order_change(order_id, "add_expense").await;

        Ok(created)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_expense(
        &self,
        order_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let order = lock_order(txn, order_id).await?;

                let expense = ExpenseEntity::find_by_id(expense_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Expense {} not found", expense_id))
                    })?;
                if expense.order_id != order_id {
                    return Err(ServiceError::OwnershipMismatch(format!(
                        "Expense {} does not belong to order {}",
                        expense_id, order_id
                    )));
                }

                ExpenseEntity::delete_by_id(expense_id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                mark_adjusted(txn, order).await?;
                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, expense_id = %expense_id, "Expense deleted");
        self.audit_order_change(order_id, "delete_expense").await;
        Ok(())
    }

    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn add_customer_due(
        &self,
        order_id: Uuid,
        request: AddCustomerDueRequest,
    ) -> Result<order_customer_due::Model, ServiceError> {
        request.validate()?;
        validate_positive("Due amount", request.amount)?;

        let db = self.db_pool.as_ref();
        let req = request.clone();

        let created = db
            .transaction::<_, order_customer_due::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = lock_order(txn, order_id).await?;
                    let created = add_customer_due_in_txn(txn, order_id, &req).await?;
                    mark_adjusted(txn, order).await?;
                    Ok(created)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, amount = %created.amount, "Customer due recorded");

        if let Err(e) = self
            .event_sender
            .send(Event::CustomerDueRecorded {
                order_id,
                amount: created.amount,
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send customer due event");
        }
        self.audit_order_change(order_id, "add_customer_due").await;

        Ok(created)
    }

    /// Records a collection against a customer due. The outstanding amount
    /// can reach zero but never go negative.
    #[instrument(skip(self), fields(due_id = %due_id))]
    pub async fn collect_customer_due(
        &self,
        due_id: Uuid,
        amount: Decimal,
    ) -> Result<order_customer_due::Model, ServiceError> {
        validate_positive("Collection amount", amount)?;

        let db = self.db_pool.as_ref();

        let updated = db
            .transaction::<_, order_customer_due::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let due = CustomerDueEntity::find_by_id(due_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Customer due {} not found", due_id))
                        })?;

                    let outstanding = due.amount - due.collected_amount;
                    if amount > outstanding {
                        return Err(ServiceError::InvalidOperation(format!(
                            "Collection {} exceeds outstanding {}",
                            amount, outstanding
                        )));
                    }

                    let order = lock_order(txn, due.order_id).await?;
                    let collected = due.collected_amount + amount.round_dp(2);
                    let mut active: order_customer_due::ActiveModel = due.into();
                    active.collected_amount = Set(collected);
                    active.updated_at = Set(Some(Utc::now()));
                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;
                    mark_adjusted(txn, order).await?;
                    Ok(updated)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(due_id = %due_id, amount = %amount, "Customer due collection recorded");
        self.audit_order_change(updated.order_id, "collect_customer_due")
            .await;
        Ok(updated)
    }

    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn add_dsr_due(
        &self,
        order_id: Uuid,
        request: AddDsrDueRequest,
    ) -> Result<order_dsr_due::Model, ServiceError> {
        validate_positive("Due amount", request.amount)?;

        let db = self.db_pool.as_ref();
        let amount = request.amount;

        let created = db
            .transaction::<_, order_dsr_due::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = lock_order(txn, order_id).await?;
                    let created = add_dsr_due_in_txn(txn, &order, amount).await?;
                    mark_adjusted(txn, order).await?;
                    Ok(created)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, amount = %created.amount, "DSR due recorded");

        if let Err(e) = self
            .event_sender
            .send(Event::DsrDueRecorded {
                order_id,
                amount: created.amount,
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send DSR due event");
        }
        self.audit_order_change(order_id, "add_dsr_due").await;

        Ok(created)
    }

    #[instrument(skip(self), fields(due_id = %due_id))]
    pub async fn collect_dsr_due(
        &self,
        due_id: Uuid,
        amount: Decimal,
    ) -> Result<order_dsr_due::Model, ServiceError> {
        validate_positive("Collection amount", amount)?;

        let db = self.db_pool.as_ref();

        let updated = db
            .transaction::<_, order_dsr_due::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let due = DsrDueEntity::find_by_id(due_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("DSR due {} not found", due_id))
                        })?;

                    let outstanding = due.amount - due.collected_amount;
                    if amount > outstanding {
                        return Err(ServiceError::InvalidOperation(format!(
                            "Collection {} exceeds outstanding {}",
                            amount, outstanding
                        )));
                    }

                    let order = lock_order(txn, due.order_id).await?;
                    let collected = due.collected_amount + amount.round_dp(2);
                    let mut active: order_dsr_due::ActiveModel = due.into();
                    active.collected_amount = Set(collected);
                    active.updated_at = Set(Some(Utc::now()));
                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;
                    mark_adjusted(txn, order).await?;
                    Ok(updated)
                })
            })
            .await
            .map_err(stock_batches::map_txn_err)?;

        info!(due_id = %due_id, amount = %amount, "DSR due collection recorded");
        self.audit_order_change(updated.order_id, "collect_dsr_due")
            .await;
        Ok(updated)
    }

    /// Applies one settlement visit in a single transaction: returns for
    /// the lines that moved, dues for what stays unpaid, and any cash
    /// handed over. Unmentioned lines stay open.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn complete_order_partially(
        &self,
        order_id: Uuid,
        request: PartialCompletionRequest,
    ) -> Result<OrderSettlementView, ServiceError> {
        for ret in &request.returns {
            ret.validate()?;
            validate_non_negative("Return amount", ret.return_amount)?;
            validate_non_negative("Adjustment discount", ret.adjustment_discount)?;
        }
        for due in &request.customer_dues {
            due.validate()?;
            validate_positive("Due amount", due.amount)?;
        }
        if let Some(due) = &request.dsr_due {
            validate_positive("Due amount", due.amount)?;
        }
        if let Some(payment) = &request.payment {
            validate_positive("Payment amount", payment.amount)?;
        }

        let db = self.db_pool.as_ref();
        let req = request.clone();

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let order = lock_order(txn, order_id).await?;

                for ret in &req.returns {
                    record_return_in_txn(txn, &order, ret).await?;
                }
                for due in &req.customer_dues {
                    add_customer_due_in_txn(txn, order_id, due).await?;
                }
                if let Some(due) = &req.dsr_due {
                    add_dsr_due_in_txn(txn, &order, due.amount).await?;
                }
                if let Some(payment) = &req.payment {
                    add_payment_in_txn(txn, &order, payment).await?;
                } else {
                    mark_adjusted(txn, order).await?;
                }
                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(
            order_id = %order_id,
            returns = request.returns.len(),
            customer_dues = request.customer_dues.len(),
            "Order partially completed"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::OrderPartiallyCompleted(order_id))
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send partial completion event");
        }
        self.audit_order_change(order_id, "complete_order_partially")
            .await;

        self.settlement(order_id).await
    }

    async fn audit_order_change(&self, order_id: Uuid, action: &str) {
        let db = self.db_pool.as_ref();
        match OrderEntity::find_by_id(order_id).one(db).await {
            Ok(Some(order)) => {
                self.audit.log(
                    action,
                    "order",
                    order_id,
                    &order.order_number,
                    None,
                    Some(AuditValue::from_order(&order)),
                );
            }
            Ok(None) => {}
            Err(e) => warn!(order_id = %order_id, error = %e, "Failed to load order for audit"),
        }
    }
}

async fn lock_order(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

/// Every settlement mutation leaves the order in `adjusted`.
async fn mark_adjusted(txn: &DatabaseTransaction, order: order::Model) -> Result<(), ServiceError> {
    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Adjusted.to_string());
    active.updated_at = Set(Some(Utc::now()));
    active.update(txn).await.map_err(ServiceError::db_error)?;
    Ok(())
}

async fn record_return_in_txn(
    txn: &DatabaseTransaction,
    order: &order::Model,
    request: &RecordReturnRequest,
) -> Result<order_item_return::Model, ServiceError> {
    let item = OrderItemEntity::find_by_id(request.order_item_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Order item {} not found", request.order_item_id))
        })?;
    if item.order_id != order.id {
        return Err(ServiceError::OwnershipMismatch(format!(
            "Order item {} does not belong to order {}",
            item.id, order.order_number
        )));
    }
    // Returns accumulate per line; the guard is against what is still out
    // with the customer, not the delivered quantity alone.
    let already_returned: i32 = ItemReturnEntity::find()
        .filter(order_item_return::Column::OrderItemId.eq(item.id))
        .all(txn)
        .await
        .map_err(ServiceError::db_error)?
        .iter()
        .map(|r| r.quantity)
        .sum();
    if already_returned + request.quantity > item.total_quantity {
        return Err(ServiceError::InvalidOperation(format!(
            "Cannot return {} units of item {}: {} of {} already returned",
            request.quantity, item.id, already_returned, item.total_quantity
        )));
    }

    if request.restock {
        let batch = StockBatchEntity::find_by_id(item.batch_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Stock batch {} not found", item.batch_id))
            })?;
        stock_adjustments::record_in_txn(
            txn,
            stock_adjustments::RecordAdjustmentRequest {
                variant_id: batch.variant_id,
                batch_id: Some(batch.id),
                adjustment_type: AdjustmentType::ReturnRestock,
                quantity: request.quantity,
                free_quantity: 0,
                order_id: Some(order.id),
                return_id: None,
                note: None,
            },
        )
        .await?;
    }

    order_item_return::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        order_item_id: Set(item.id),
        quantity: Set(request.quantity),
        return_amount: Set(request.return_amount.round_dp(2)),
        adjustment_discount: Set(request.adjustment_discount.round_dp(2)),
        restocked: Set(request.restock),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)
}

/// Insert plus the paid-amount rollup; also flips the order to adjusted.
async fn add_payment_in_txn(
    txn: &DatabaseTransaction,
    order: &order::Model,
    request: &AddPaymentRequest,
) -> Result<order_payment::Model, ServiceError> {
    let created = order_payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(request.amount.round_dp(2)),
        method: Set(request.method.clone()),
        recorded_at: Set(Utc::now()),
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)?;

    let paid = order.paid_amount + created.amount;
    apply_paid_amount(txn, order.clone(), paid).await?;
    Ok(created)
}

async fn apply_paid_amount(
    txn: &DatabaseTransaction,
    order: order::Model,
    paid: Decimal,
) -> Result<(), ServiceError> {
    let status = payment_status_for(paid, order.total);
    let mut active: order::ActiveModel = order.into();
    active.paid_amount = Set(paid);
    active.payment_status = Set(status.to_string());
    active.status = Set(OrderStatus::Adjusted.to_string());
    active.updated_at = Set(Some(Utc::now()));
    active.update(txn).await.map_err(ServiceError::db_error)?;
    Ok(())
}

async fn add_customer_due_in_txn(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    request: &AddCustomerDueRequest,
) -> Result<order_customer_due::Model, ServiceError> {
    order_customer_due::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        customer_name: Set(request.customer_name.clone()),
        amount: Set(request.amount.round_dp(2)),
        collected_amount: Set(Decimal::ZERO),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)
}

async fn add_dsr_due_in_txn(
    txn: &DatabaseTransaction,
    order: &order::Model,
    amount: Decimal,
) -> Result<order_dsr_due::Model, ServiceError> {
    order_dsr_due::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        dsr_id: Set(order.dsr_id),
        amount: Set(amount.round_dp(2)),
        collected_amount: Set(Decimal::ZERO),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)
}

fn payment_status_for(paid: Decimal, total: Decimal) -> &'static str {
    if paid <= Decimal::ZERO {
        "unpaid"
    } else if paid >= total {
        "paid"
    } else {
        "partial"
    }
}

fn validate_positive(label: &str, amount: Decimal) -> Result<(), ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must be positive",
            label
        )));
    }
    Ok(())
}

fn validate_non_negative(label: &str, amount: Decimal) -> Result<(), ServiceError> {
    if amount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            label
        )));
    }
    Ok(())
}

fn build_view(
    order: order::Model,
    items: &[order_item::Model],
    returns: Vec<order_item_return::Model>,
    payments: Vec<order_payment::Model>,
    expenses: Vec<order_expense::Model>,
    customer_dues: Vec<order_customer_due::Model>,
    dsr_dues: Vec<order_dsr_due::Model>,
) -> OrderSettlementView {
    let total_returns: Decimal = returns.iter().map(|r| r.return_amount).sum();
    let total_adjustments: Decimal = returns.iter().map(|r| r.adjustment_discount).sum();
    let net_order_total = order.total - total_returns - total_adjustments;

    let total_payments: Decimal = payments.iter().map(|p| p.amount).sum();
    let total_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();
    let total_customer_due: Decimal = customer_dues
        .iter()
        .map(|d| d.amount - d.collected_amount)
        .sum();

    let computed_dsr_due = net_order_total - total_payments - total_expenses;
    let recorded_dsr_due: Decimal = dsr_dues
        .iter()
        .map(|d| d.amount - d.collected_amount)
        .sum();
    let dsr_due_discrepancy = computed_dsr_due - recorded_dsr_due;

    let item_profits: Vec<ItemProfit> = items
        .iter()
        .map(|item| {
            let item_returns: Decimal = returns
                .iter()
                .filter(|r| r.order_item_id == item.id)
                .map(|r| r.return_amount)
                .sum();
            let item_adjustments: Decimal = returns
                .iter()
                .filter(|r| r.order_item_id == item.id)
                .map(|r| r.adjustment_discount)
                .sum();
            ItemProfit {
                order_item_id: item.id,
                net: item.net,
                returns: item_returns,
                adjustment_discounts: item_adjustments,
                profit: item.net - item_returns - item_adjustments,
            }
        })
        .collect();
    let aggregate_profit: Decimal = item_profits.iter().map(|p| p.profit).sum();

    OrderSettlementView {
        order,
        net_order_total,
        total_payments,
        total_expenses,
        total_customer_due,
        computed_dsr_due,
        recorded_dsr_due,
        dsr_due_discrepancy,
        item_profits,
        aggregate_profit,
        returns,
        payments,
        expenses,
        customer_dues,
        dsr_dues,
    }
}
