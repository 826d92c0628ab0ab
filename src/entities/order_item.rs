use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One order line, bound to exactly one stock batch (no split allocation).
///
/// Price fields are a snapshot taken at creation; later batch price
/// changes never touch historical orders. Derived fields obey
/// `total_quantity = quantity*multiplier(unit) + extra_pieces + free_quantity`,
/// `subtotal = (quantity*multiplier + extra_pieces) * sale_price` (free
/// units are never charged) and `net = subtotal - discount`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Uuid,
    pub quantity: i32,
    pub unit: String,
    pub free_quantity: i32,
    pub extra_pieces: i32,
    pub sale_price: Decimal,
    pub discount: Decimal,
    pub subtotal: Decimal,
    pub net: Decimal,
    pub total_quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::stock_batch::Entity",
        from = "Column::BatchId",
        to = "super::stock_batch::Column::Id"
    )]
    Batch,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::stock_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
