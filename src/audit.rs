use crate::{
    db::DbPool,
    entities::{audit_log, damage_return, order, stock_adjustment, stock_batch},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Structured before/after snapshot written to the audit trail.
///
/// A tagged union per entity rather than free-form JSON, so the sink
/// interface stays type-checked end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditValue {
    Order {
        order_number: String,
        subtotal: Decimal,
        discount: Decimal,
        total: Decimal,
        status: String,
    },
    StockBatch {
        variant_id: Uuid,
        remaining_quantity: i32,
        remaining_free_qty: i32,
    },
    StockAdjustment {
        adjustment_type: String,
        quantity: i32,
        free_quantity: i32,
    },
    DamageReturn {
        return_number: String,
        status: String,
        total_amount: Decimal,
    },
}

impl AuditValue {
    pub fn from_order(m: &order::Model) -> Self {
        AuditValue::Order {
            order_number: m.order_number.clone(),
            subtotal: m.subtotal,
            discount: m.discount,
            total: m.total,
            status: m.status.clone(),
        }
    }

    pub fn from_batch(m: &stock_batch::Model) -> Self {
        AuditValue::StockBatch {
            variant_id: m.variant_id,
            remaining_quantity: m.remaining_quantity,
            remaining_free_qty: m.remaining_free_qty,
        }
    }

    pub fn from_adjustment(m: &stock_adjustment::Model) -> Self {
        AuditValue::StockAdjustment {
            adjustment_type: m.adjustment_type.clone(),
            quantity: m.quantity,
            free_quantity: m.free_quantity,
        }
    }

    pub fn from_damage_return(m: &damage_return::Model) -> Self {
        AuditValue::DamageReturn {
            return_number: m.return_number.clone(),
            status: m.status.clone(),
            total_amount: m.total_amount,
        }
    }
}

/// Fire-and-forget audit trail writer.
///
/// `log` spawns the insert; a failed write is logged and swallowed so it
/// can never abort the primary mutation it describes.
#[derive(Clone)]
pub struct AuditSink {
    db_pool: Arc<DbPool>,
}

impl AuditSink {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub fn log(
        &self,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        entity_name: &str,
        old_value: Option<AuditValue>,
        new_value: Option<AuditValue>,
    ) {
        let entry = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            action: Set(action.to_string()),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id),
            entity_name: Set(entity_name.to_string()),
            old_value: Set(old_value.as_ref().and_then(serialize_value)),
            new_value: Set(new_value.as_ref().and_then(serialize_value)),
            created_at: Set(Utc::now()),
        };

        let db = self.db_pool.clone();
        tokio::spawn(async move {
            if let Err(e) = entry.insert(db.as_ref()).await {
                warn!(error = %e, "Audit log write failed");
            }
        });
    }
}

fn serialize_value(value: &AuditValue) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "Failed to serialize audit value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn audit_value_serializes_with_kind_tag() {
        let value = AuditValue::Order {
            order_number: "WO-2024-0001".to_string(),
            subtotal: dec!(620.00),
            discount: dec!(5.00),
            total: dec!(615.00),
            status: "pending".to_string(),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"kind\":\"order\""));
        assert!(json.contains("WO-2024-0001"));

        let back: AuditValue = serde_json::from_str(&json).unwrap();
        match back {
            AuditValue::Order { total, .. } => assert_eq!(total, dec!(615.00)),
            other => panic!("wrong variant: {:?}", other),
        }
    }
}
