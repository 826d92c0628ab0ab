use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::entities::{
    order_customer_due, order_dsr_due, order_expense, order_item_return, order_payment,
};
use crate::errors::ServiceError;
use crate::services::orders::{CreateOrderRequest, OrderListResponse, OrderResponse, UpdateOrderRequest};
use crate::services::settlement::{
    AddCustomerDueRequest, AddDsrDueRequest, AddExpenseRequest, AddPaymentRequest,
    OrderSettlementView, PartialCompletionRequest, RecordReturnRequest,
};
use crate::{ApiResponse, AppState, ListQuery};

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let orders = state
        .services
        .orders
        .list_orders(query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.update_order(id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let status = OrderStatus::from_str(request.status.trim()).map_err(|_| {
        ServiceError::ValidationError(format!("Unknown order status: {}", request.status))
    })?;
    let order = state.services.orders.update_order_status(id, status).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn get_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderSettlementView>>, ServiceError> {
    let view = state.services.settlement.settlement(id).await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn record_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordReturnRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_item_return::Model>>), ServiceError> {
    let created = state.services.settlement.record_return(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn add_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_payment::Model>>), ServiceError> {
    let created = state.services.settlement.add_payment(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Path((id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .settlement
        .delete_payment(id, payment_id)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn add_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_expense::Model>>), ServiceError> {
    let created = state.services.settlement.add_expense(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path((id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state
        .services
        .settlement
        .delete_expense(id, expense_id)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn add_customer_due(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddCustomerDueRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_customer_due::Model>>), ServiceError> {
    let created = state
        .services
        .settlement
        .add_customer_due(id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[derive(Debug, Deserialize)]
pub struct CollectDueRequest {
    pub amount: Decimal,
}

pub async fn collect_customer_due(
    State(state): State<AppState>,
    Path(due_id): Path<Uuid>,
    Json(request): Json<CollectDueRequest>,
) -> Result<Json<ApiResponse<order_customer_due::Model>>, ServiceError> {
    let updated = state
        .services
        .settlement
        .collect_customer_due(due_id, request.amount)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn add_dsr_due(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddDsrDueRequest>,
) -> Result<(StatusCode, Json<ApiResponse<order_dsr_due::Model>>), ServiceError> {
    let created = state.services.settlement.add_dsr_due(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn collect_dsr_due(
    State(state): State<AppState>,
    Path(due_id): Path<Uuid>,
    Json(request): Json<CollectDueRequest>,
) -> Result<Json<ApiResponse<order_dsr_due::Model>>, ServiceError> {
    let updated = state
        .services
        .settlement
        .collect_dsr_due(due_id, request.amount)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn complete_order_partially(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PartialCompletionRequest>,
) -> Result<Json<ApiResponse<OrderSettlementView>>, ServiceError> {
    let view = state
        .services
        .settlement
        .complete_order_partially(id, request)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}
