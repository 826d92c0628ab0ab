//! Stockledger API Library
//!
//! Batch-level inventory ledger and order settlement engine for a
//! single-warehouse wholesale distribution operation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod audit;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{extract::State, response::Json, routing::{delete, get, post, put}, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

pub(crate) fn default_page() -> u64 {
    1
}
pub(crate) fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    pub timestamp: String,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/status", put(handlers::orders::update_order_status));

    let settlement = Router::new()
        .route("/orders/:id/settlement", get(handlers::orders::get_settlement))
        .route("/orders/:id/returns", post(handlers::orders::record_return))
        .route("/orders/:id/payments", post(handlers::orders::add_payment))
        .route(
            "/orders/:id/payments/:payment_id",
            delete(handlers::orders::delete_payment),
        )
        .route("/orders/:id/expenses", post(handlers::orders::add_expense))
        .route(
            "/orders/:id/expenses/:expense_id",
            delete(handlers::orders::delete_expense),
        )
        .route(
            "/orders/:id/customer-dues",
            post(handlers::orders::add_customer_due),
        )
        .route("/orders/:id/dsr-dues", post(handlers::orders::add_dsr_due))
        .route(
            "/orders/:id/complete-partially",
            post(handlers::orders::complete_order_partially),
        )
        .route(
            "/customer-dues/:id/collect",
            post(handlers::orders::collect_customer_due),
        )
        .route(
            "/dsr-dues/:id/collect",
            post(handlers::orders::collect_dsr_due),
        );

    let stock = Router::new()
        .route(
            "/stock/batches",
            get(handlers::stock::list_batches).post(handlers::stock::create_batch),
        )
        .route("/stock/batches/:id", get(handlers::stock::get_batch))
        .route(
            "/stock/adjustments",
            get(handlers::stock::list_adjustments).post(handlers::stock::record_adjustment),
        )
        .route("/stock/adjustments/:id", get(handlers::stock::get_adjustment));

    let damage_returns = Router::new()
        .route(
            "/damage-returns",
            get(handlers::damage_returns::list_damage_returns)
                .post(handlers::damage_returns::create_damage_return),
        )
        .route(
            "/damage-returns/:id",
            get(handlers::damage_returns::get_damage_return)
                .delete(handlers::damage_returns::delete_damage_return),
        )
        .route(
            "/damage-returns/:id/approve",
            post(handlers::damage_returns::approve_damage_return),
        )
        .route(
            "/damage-returns/:id/reject",
            post(handlers::damage_returns::reject_damage_return),
        );

    let analytics = Router::new()
        .route("/analytics/sales-summary", get(handlers::analytics::sales_summary))
        .route("/analytics/sales-by-dsr", get(handlers::analytics::sales_by_dsr))
        .route("/analytics/sales-by-route", get(handlers::analytics::sales_by_route))
        .route(
            "/analytics/sales-by-product",
            get(handlers::analytics::sales_by_product),
        );

    Router::new()
        .route("/status", get(api_status))
        .merge(orders)
        .merge(settlement)
        .merge(stock)
        .merge(damage_returns)
        .merge(analytics)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "stockledger-api",
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

/// Prometheus exposition for everything registered in the default
/// registry.
pub async fn metrics_handler() -> Result<String, errors::ServiceError> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| errors::ServiceError::InternalError(format!("metrics encode: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| errors::ServiceError::InternalError(format!("metrics encode: {}", e)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn success_response_carries_data_and_timestamp() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        DateTime::parse_from_rfc3339(&response.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn error_response_has_no_data() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }

    #[test]
    fn validation_errors_are_listed() {
        let response = ApiResponse::<()>::validation_errors(vec!["missing".into()]);
        assert!(!response.success);
        assert_eq!(response.errors.as_deref(), Some(&["missing".to_string()][..]));
    }
}
