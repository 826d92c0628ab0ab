use crate::{
    audit::{AuditSink, AuditValue},
    db::DbPool,
    entities::{
        dsr::Entity as DsrEntity,
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        product_variant::Entity as VariantEntity,
        route::Entity as RouteEntity,
        stock_batch,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{stock_batches, units},
};
use chrono::{DateTime, Datelike, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, ModelTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref ORDER_CREATIONS: IntCounter =
        IntCounter::new("order_creations_total", "Total number of orders created")
            .expect("metric can be created");
    static ref ORDER_CREATION_FAILURES: IntCounter = IntCounter::new(
        "order_creation_failures_total",
        "Total number of failed order creations"
    )
    .expect("metric can be created");
}

/// Request/response types for the order service
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    /// The exact lot this line draws from; allocation is caller-driven,
    /// never FIFO-automatic.
    pub batch_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(min = 1, message = "Unit code is required"))]
    pub unit: String,
    #[validate(range(min = 0))]
    pub free_quantity: i32,
    #[validate(range(min = 0))]
    pub extra_pieces: i32,
    pub sale_price: Decimal,
    pub discount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub dsr_id: Uuid,
    pub route_id: Uuid,
    pub order_date: DateTime<Utc>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    pub order_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub item: order_item::Model,
    pub batch: Option<stock_batch::Model>,
}

/// The fully joined order view returned from every order operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: order::Model,
    pub items: Vec<OrderItemResponse>,
    pub dsr_name: Option<String>,
    pub route_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Derived figures for one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    pub paid_quantity: i32,
    pub total_quantity: i32,
    pub subtotal: Decimal,
    pub net: Decimal,
}

/// Pure line arithmetic: free units are never charged.
///
/// `paid_quantity = quantity*multiplier + extra_pieces`,
/// `subtotal = paid_quantity * sale_price`, `net = subtotal - discount`,
/// `total_quantity = paid_quantity + free_quantity`.
pub fn compute_line(
    quantity: i32,
    multiplier: i32,
    extra_pieces: i32,
    free_quantity: i32,
    sale_price: Decimal,
    discount: Decimal,
) -> LineTotals {
    let paid_quantity = quantity * multiplier + extra_pieces;
    let subtotal = (Decimal::from(paid_quantity) * sale_price).round_dp(2);
    LineTotals {
        paid_quantity,
        total_quantity: paid_quantity + free_quantity,
        subtotal,
        net: (subtotal - discount).round_dp(2),
    }
}

/// Order allocation engine: creates, replaces, and deletes orders while
/// keeping batch reservations consistent. All mutations are single
/// transactions; a failed line leaves no trace.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    audit: Arc<AuditSink>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, audit: Arc<AuditSink>) -> Self {
        Self {
            db_pool,
            event_sender,
            audit,
        }
    }

    /// Creates an order and its items, reserving every line's batch
    /// quantities in the same transaction (all-or-nothing).
    #[instrument(skip(self, request), fields(dsr_id = %request.dsr_id, items = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate().map_err(|e| {
            ORDER_CREATION_FAILURES.inc();
            ServiceError::ValidationError(e.to_string())
        })?;
        validate_money(&request.items).map_err(|e| {
            ORDER_CREATION_FAILURES.inc();
            e
        })?;

        let db = self.db_pool.as_ref();
        let dsr_id = request.dsr_id;
        let route_id = request.route_id;
        let order_date = request.order_date;
        let items = request.items;

        let order_id = db
            .transaction::<_, Uuid, ServiceError>(move |txn| {
                Box::pin(async move {
                    let dsr = DsrEntity::find_by_id(dsr_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::NotFound(format!("DSR {} not found", dsr_id)))?;
                    RouteEntity::find_by_id(route_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Route {} not found", route_id))
                        })?;

                    let order_id = Uuid::new_v4();
                    let order_number = next_order_number(txn, order_date.year()).await?;
                    let now = Utc::now();

                    let totals = allocate_items(txn, order_id, &items).await?;

                    order::ActiveModel {
                        id: Set(order_id),
                        order_number: Set(order_number.clone()),
                        dsr_id: Set(dsr.id),
                        route_id: Set(route_id),
                        order_date: Set(order_date),
                        subtotal: Set(totals.subtotal),
                        discount: Set(totals.discount),
                        total: Set(totals.total),
                        paid_amount: Set(Decimal::ZERO),
                        payment_status: Set("unpaid".to_string()),
                        status: Set(OrderStatus::Pending.to_string()),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        error!(error = %e, %order_number, "Failed to insert order");
                        ServiceError::db_error(e)
                    })?;

                    Ok(order_id)
                })
            })
            .await
            .map_err(|e| {
                ORDER_CREATION_FAILURES.inc();
                stock_batches::map_txn_err(e)
            })?;

        ORDER_CREATIONS.inc();
        info!(order_id = %order_id, "Order created successfully");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(order_id = %order_id, error = %e, "Failed to send order created event");
        }

        let response = self.get_order(order_id).await?;
        self.audit.log(
            "create",
            "order",
            order_id,
            &response.order.order_number,
            None,
            Some(AuditValue::from_order(&response.order)),
        );
        Ok(response)
    }

    /// Retrieves the fully joined order view.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order
            .find_related(OrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut item_views = Vec::with_capacity(items.len());
        for item in items {
            let batch = stock_batch::Entity::find_by_id(item.batch_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            item_views.push(OrderItemResponse { item, batch });
        }

        let dsr_name = DsrEntity::find_by_id(order.dsr_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .map(|d| d.name);
        let route_name = RouteEntity::find_by_id(order.route_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .map(|r| r.name);

        Ok(OrderResponse {
            order,
            items: item_views,
            dsr_name,
            route_name,
        })
    }

    /// Lists orders with pagination, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::OrderDate)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count orders");
            ServiceError::db_error(e)
        })?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Replaces an order's items wholesale.
    ///
    /// The prior items' batch reservations are restored before the new
    /// set is validated and reserved, so the swap cannot leak stock. One
    /// transaction: on any failure the original order and reservations
    /// stand untouched.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        validate_money(&request.items)?;

        let db = self.db_pool.as_ref();
        let old = self.get_order(order_id).await?;
        let items = request.items;
        let order_date = request.order_date;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let order = OrderEntity::find_by_id(order_id)
                    .lock_exclusive()
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Order {} not found", order_id))
                    })?;

                release_order_items(txn, order_id).await?;

                let totals = allocate_items(txn, order_id, &items).await?;

                let mut active: order::ActiveModel = order.into();
                if let Some(date) = order_date {
                    active.order_date = Set(date);
                }
                active.subtotal = Set(totals.subtotal);
                active.discount = Set(totals.discount);
                active.total = Set(totals.total);
                active.updated_at = Set(Some(Utc::now()));
                active.update(txn).await.map_err(ServiceError::db_error)?;

                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, "Order updated");

        if let Err(e) = self.event_sender.send(Event::OrderUpdated(order_id)).await {
            warn!(order_id = %order_id, error = %e, "Failed to send order updated event");
        }

        let response = self.get_order(order_id).await?;
        self.audit.log(
            "update",
            "order",
            order_id,
            &response.order.order_number,
            Some(AuditValue::from_order(&old.order)),
            Some(AuditValue::from_order(&response.order)),
        );
        Ok(response)
    }

    /// Deletes an order, restoring every item's batch reservation first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let old = self.get_order(order_id).await?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let order = OrderEntity::find_by_id(order_id)
                    .lock_exclusive()
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Order {} not found", order_id))
                    })?;

                release_order_items(txn, order_id).await?;
                order.delete(txn).await.map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await
        .map_err(stock_batches::map_txn_err)?;

        info!(order_id = %order_id, "Order deleted, reservations restored");

        if let Err(e) = self.event_sender.send(Event::OrderDeleted(order_id)).await {
            warn!(order_id = %order_id, error = %e, "Failed to send order deleted event");
        }

        self.audit.log(
            "delete",
            "order",
            order_id,
            &old.order.order_number,
            Some(AuditValue::from_order(&old.order)),
            None,
        );
        Ok(())
    }

    /// Moves an order between the two lifecycle states.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let db = self.db_pool.as_ref();

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status.clone();
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status.to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::db_error)?;

        info!(order_id = %order_id, %old_status, new_status = %status, "Order status updated");

        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: status.to_string(),
            })
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to send status changed event");
        }

        self.get_order(order_id).await
    }
}

#[derive(Debug, Clone, Copy)]
struct OrderTotals {
    subtotal: Decimal,
    discount: Decimal,
    total: Decimal,
}

fn validate_money(items: &[OrderItemRequest]) -> Result<(), ServiceError> {
    for item in items {
        item.validate()?;
        if item.sale_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Sale price must not be negative".to_string(),
            ));
        }
        if item.discount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount must not be negative".to_string(),
            ));
        }
    }
    Ok(())
}

/// Generates the next `WO-<year>-NNNN` number. Runs inside the order
/// transaction with the latest-row read locked, which serializes
/// concurrent generation per year.
async fn next_order_number(
    txn: &DatabaseTransaction,
    year: i32,
) -> Result<String, ServiceError> {
    let prefix = format!("WO-{}-", year);

    // Length-first ordering: the zero-padded suffix grows past four
    // digits eventually, and "10000" sorts below "9999" as a plain
    // string.
    let latest = OrderEntity::find()
        .filter(order::Column::OrderNumber.starts_with(prefix.clone()))
        .order_by(Expr::cust(r#"LENGTH("order_number")"#), Order::Desc)
        .order_by_desc(order::Column::OrderNumber)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?;

    let next_seq = match latest {
        Some(o) => o
            .order_number
            .rsplit('-')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|n| n + 1)
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Malformed order number: {}",
                    o.order_number
                ))
            })?,
        None => 1,
    };

    Ok(format!("{}{:04}", prefix, next_seq))
}

/// Validates and reserves every requested line, inserting its order item.
/// Caller provides the transaction; any failure aborts the whole batch.
async fn allocate_items(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    items: &[OrderItemRequest],
) -> Result<OrderTotals, ServiceError> {
    let mut subtotal = Decimal::ZERO;
    let mut discount = Decimal::ZERO;

    for item in items {
        let multiplier = units::multiplier(txn, &item.unit).await;
        let line = compute_line(
            item.quantity,
            multiplier,
            item.extra_pieces,
            item.free_quantity,
            item.sale_price,
            item.discount,
        );

        let batch = stock_batches::load_batch_for_update(txn, item.batch_id).await?;
        let variant = VariantEntity::find_by_id(batch.variant_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", batch.variant_id))
            })?;
        if variant.product_id != item.product_id {
            return Err(ServiceError::OwnershipMismatch(format!(
                "Batch {} does not belong to product {}",
                item.batch_id, item.product_id
            )));
        }

        stock_batches::reserve_in_txn(txn, item.batch_id, line.total_quantity, item.free_quantity)
            .await?;

        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(item.product_id),
            batch_id: Set(item.batch_id),
            quantity: Set(item.quantity),
            unit: Set(item.unit.clone()),
            free_quantity: Set(item.free_quantity),
            extra_pieces: Set(item.extra_pieces),
            sale_price: Set(item.sale_price.round_dp(2)),
            discount: Set(item.discount.round_dp(2)),
            subtotal: Set(line.subtotal),
            net: Set(line.net),
            total_quantity: Set(line.total_quantity),
        }
        .insert(txn)
        .await
        .map_err(ServiceError::db_error)?;

        subtotal += line.subtotal;
        discount += item.discount;
    }

    let subtotal = subtotal.round_dp(2);
    let discount = discount.round_dp(2);
    Ok(OrderTotals {
        subtotal,
        discount,
        total: (subtotal - discount).round_dp(2),
    })
}

/// Restores the batch reservations of every item on the order, then
/// deletes the items. Used by update (before re-allocation) and delete.
async fn release_order_items(
    txn: &DatabaseTransaction,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(txn)
        .await
        .map_err(ServiceError::db_error)?;

    for item in items {
        stock_batches::adjust_in_txn(
            txn,
            item.batch_id,
            item.total_quantity,
            item.free_quantity,
            stock_batches::Overfill::Reject,
        )
        .await?;
        item.delete(txn).await.map_err(ServiceError::db_error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn box_line_arithmetic() {
        // 5 x BOX(12) + 2 extra + 3 free @ 10.00, line discount 5.00
        let line = compute_line(5, 12, 2, 3, dec!(10.00), dec!(5.00));
        assert_eq!(line.paid_quantity, 62);
        assert_eq!(line.subtotal, dec!(620.00));
        assert_eq!(line.net, dec!(615.00));
        assert_eq!(line.total_quantity, 65);
    }

    #[test]
    fn free_units_are_never_charged() {
        let line = compute_line(1, 1, 0, 100, dec!(7.50), dec!(0));
        assert_eq!(line.subtotal, dec!(7.50));
        assert_eq!(line.total_quantity, 101);
    }

    #[test]
    fn net_is_subtotal_minus_discount_at_two_dp() {
        let line = compute_line(3, 24, 0, 0, dec!(1.333), dec!(0.99));
        assert_eq!(line.subtotal, dec!(95.98)); // 72 * 1.333 = 95.976
        assert_eq!(line.net, dec!(94.99));
    }

    #[test]
    fn items_are_required() {
        let req = CreateOrderRequest {
            dsr_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            order_date: Utc::now(),
            items: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn negative_discount_is_rejected() {
        let items = vec![OrderItemRequest {
            product_id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            quantity: 1,
            unit: "PCS".to_string(),
            free_quantity: 0,
            extra_pieces: 0,
            sale_price: dec!(10.00),
            discount: dec!(-1.00),
        }];
        assert!(validate_money(&items).is_err());
    }
}
