use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;

use crate::errors::ServiceError;
use crate::services::analytics::{DimensionSales, SalesBucket, TimeBucket};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// `daily`, `weekly` or `monthly`; summary endpoint only.
    pub bucket: Option<String>,
}

pub async fn sales_summary(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<SalesBucket>>>, ServiceError> {
    let bucket = match query.bucket.as_deref() {
        None => TimeBucket::Daily,
        Some(raw) => TimeBucket::from_str(raw.trim()).map_err(|_| {
            ServiceError::ValidationError(format!("Unknown time bucket: {}", raw))
        })?,
    };
    let buckets = state
        .services
        .analytics
        .sales_summary(query.start, query.end, bucket)
        .await?;
    Ok(Json(ApiResponse::success(buckets)))
}

pub async fn sales_by_dsr(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<DimensionSales>>>, ServiceError> {
    let rows = state
        .services
        .analytics
        .sales_by_dsr(query.start, query.end)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn sales_by_route(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<DimensionSales>>>, ServiceError> {
    let rows = state
        .services
        .analytics
        .sales_by_route(query.start, query.end)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn sales_by_product(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<DimensionSales>>>, ServiceError> {
    let rows = state
        .services
        .analytics
        .sales_by_product(query.start, query.end)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
