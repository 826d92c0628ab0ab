use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Append-only log of every out-of-band batch quantity mutation.
/// Quantities are signed deltas. Each row pairs with exactly one batch
/// mutation performed in the same transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_adjustments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub adjustment_type: String,
    pub quantity: i32,
    pub free_quantity: i32,
    pub order_id: Option<Uuid>,
    pub return_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum AdjustmentType {
    ReturnRestock,
    Damage,
    Manual,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    Variant,
    #[sea_orm(
        belongs_to = "super::stock_batch::Entity",
        from = "Column::BatchId",
        to = "super::stock_batch::Column::Id"
    )]
    Batch,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl Related<super::stock_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn adjustment_type_round_trips_through_strings() {
        assert_eq!(AdjustmentType::ReturnRestock.to_string(), "return_restock");
        assert_eq!(
            AdjustmentType::from_str("damage").unwrap(),
            AdjustmentType::Damage
        );
        assert!(AdjustmentType::from_str("write_off").is_err());
    }
}
