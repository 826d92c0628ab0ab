pub mod analytics;
pub mod damage_returns;
pub mod orders;
pub mod stock;

use crate::audit::AuditSink;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

pub use crate::AppState;

/// Service container handed to handlers through [`AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::orders::OrderService>,
    pub stock_batches: Arc<crate::services::stock_batches::StockBatchService>,
    pub stock_adjustments: Arc<crate::services::stock_adjustments::StockAdjustmentService>,
    pub damage_returns: Arc<crate::services::damage_returns::DamageReturnService>,
    pub settlement: Arc<crate::services::settlement::SettlementService>,
    pub analytics: Arc<crate::services::analytics::AnalyticsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let audit = Arc::new(AuditSink::new(db_pool.clone()));

        Self {
            orders: Arc::new(crate::services::orders::OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                audit.clone(),
            )),
            stock_batches: Arc::new(crate::services::stock_batches::StockBatchService::new(
                db_pool.clone(),
                event_sender.clone(),
                audit.clone(),
            )),
            stock_adjustments: Arc::new(
                crate::services::stock_adjustments::StockAdjustmentService::new(
                    db_pool.clone(),
                    event_sender.clone(),
                    audit.clone(),
                ),
            ),
            damage_returns: Arc::new(crate::services::damage_returns::DamageReturnService::new(
                db_pool.clone(),
                event_sender.clone(),
                audit.clone(),
            )),
            settlement: Arc::new(crate::services::settlement::SettlementService::new(
                db_pool.clone(),
                event_sender,
                audit,
            )),
            analytics: Arc::new(crate::services::analytics::AnalyticsService::new(db_pool)),
        }
    }
}
