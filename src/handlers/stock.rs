use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{stock_adjustment, stock_batch};
use crate::errors::ServiceError;
use crate::services::stock_adjustments::RecordAdjustmentRequest;
use crate::services::stock_batches::CreateBatchRequest;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize)]
pub struct StockListQuery {
    pub variant_id: Option<Uuid>,
    #[serde(default = "crate::default_page")]
    pub page: u64,
    #[serde(default = "crate::default_limit")]
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct BatchListResponse {
    pub batches: Vec<stock_batch::Model>,
    pub total: u64,
}

pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<stock_batch::Model>>), ServiceError> {
    let batch = state.services.stock_batches.create_batch(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(batch))))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<stock_batch::Model>>, ServiceError> {
    let batch = state.services.stock_batches.get_batch(id).await?;
    Ok(Json(ApiResponse::success(batch)))
}

pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<StockListQuery>,
) -> Result<Json<ApiResponse<BatchListResponse>>, ServiceError> {
    let (batches, total) = state
        .services
        .stock_batches
        .list_batches(query.variant_id, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(BatchListResponse {
        batches,
        total,
    })))
}

pub async fn record_adjustment(
    State(state): State<AppState>,
    Json(request): Json<RecordAdjustmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<stock_adjustment::Model>>), ServiceError> {
    let adjustment = state.services.stock_adjustments.record(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(adjustment))))
}

pub async fn get_adjustment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<stock_adjustment::Model>>, ServiceError> {
    let adjustment = state.services.stock_adjustments.get(id).await?;
    Ok(Json(ApiResponse::success(adjustment)))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    Query(query): Query<StockListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<stock_adjustment::Model>>>, ServiceError> {
    let (items, total) = state
        .services
        .stock_adjustments
        .list(query.variant_id, query.page, query.limit)
        .await?;
    let total_pages = if query.limit == 0 {
        0
    } else {
        (total + query.limit - 1) / query.limit
    };
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}
