use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::damage_return;
use crate::errors::ServiceError;
use crate::services::damage_returns::{CreateDamageReturnRequest, DamageReturnResponse};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

pub async fn create_damage_return(
    State(state): State<AppState>,
    Json(request): Json<CreateDamageReturnRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DamageReturnResponse>>), ServiceError> {
    let created = state.services.damage_returns.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_damage_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DamageReturnResponse>>, ServiceError> {
    let found = state.services.damage_returns.get(id).await?;
    Ok(Json(ApiResponse::success(found)))
}

pub async fn list_damage_returns(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<damage_return::Model>>>, ServiceError> {
    let (items, total) = state
        .services
        .damage_returns
        .list(query.page, query.limit)
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

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approved_by: Uuid,
}

pub async fn approve_damage_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<ApiResponse<DamageReturnResponse>>, ServiceError> {
    let approved = state
        .services
        .damage_returns
        .approve(id, request.approved_by)
        .await?;
    Ok(Json(ApiResponse::success(approved)))
}

pub async fn reject_damage_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DamageReturnResponse>>, ServiceError> {
    let rejected = state.services.damage_returns.reject(id).await?;
    Ok(Json(ApiResponse::success(rejected)))
}

pub async fn delete_damage_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.damage_returns.delete(id).await?;
    Ok(Json(ApiResponse::success(())))
}
