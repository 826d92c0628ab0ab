use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use stockledger_api::{
    config::AppConfig,
    db,
    entities::{dsr, product_variant, route, stock_batch, unit},
    events::{process_events, EventSender},
    handlers::AppServices,
    services::stock_batches::CreateBatchRequest,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with migrations
/// applied. One pooled connection, so transactions serialize naturally.
pub struct TestContext {
    pub db: Arc<db::DbPool>,
    pub services: AppServices,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestContext {
    pub async fn new() -> Self {
        let cfg = AppConfig::for_tests("sqlite::memory:");
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("db connect");
        db::run_migrations(&pool).await.expect("migrations");

        let db_arc = Arc::new(pool);
        let (tx, rx) = mpsc::channel(100);
        let sender = Arc::new(EventSender::new(tx));
        let event_task = tokio::spawn(process_events(rx));

        let services = AppServices::new(db_arc.clone(), sender);
        Self {
            db: db_arc,
            services,
            _event_task: event_task,
        }
    }

    pub async fn seed_variant(&self, name: &str) -> product_variant::Model {
        product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed variant")
    }

    pub async fn seed_unit(&self, abbreviation: &str, multiplier: i32) -> unit::Model {
        unit::ActiveModel {
            id: Set(Uuid::new_v4()),
            abbreviation: Set(abbreviation.to_string()),
            name: Set(abbreviation.to_string()),
            multiplier: Set(multiplier),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed unit")
    }

    pub async fn seed_dsr(&self, name: &str) -> dsr::Model {
        dsr::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            phone: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed dsr")
    }

    pub async fn seed_route(&self, name: &str) -> route::Model {
        route::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed route")
    }

    /// Intake one batch through the service so the supplier-purchase
    /// ledger entry is written too.
    pub async fn seed_batch(
        &self,
        variant_id: Uuid,
        quantity: i32,
        free_quantity: i32,
        supplier_price: Decimal,
        sell_price: Decimal,
    ) -> stock_batch::Model {
        self.services
            .stock_batches
            .create_batch(CreateBatchRequest {
                variant_id,
                supplier_name: "Acme Distribution".to_string(),
                supplier_price,
                sell_price,
                quantity,
                free_quantity,
            })
            .await
            .expect("seed batch")
    }

    pub async fn reload_batch(&self, batch_id: Uuid) -> stock_batch::Model {
        self.services
            .stock_batches
            .get_batch(batch_id)
            .await
            .expect("reload batch")
    }
}
