use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// One line of a damage return. When a batch is linked the unit price is
/// the batch's supplier price, not whatever the caller supplied.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "damage_return_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub damage_return_id: Uuid,
    pub variant_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub condition: String,
}

/// Whether returned goods can re-enter sellable stock on approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum ItemCondition {
    Resellable,
    Damaged,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::damage_return::Entity",
        from = "Column::DamageReturnId",
        to = "super::damage_return::Column::Id"
    )]
    DamageReturn,
    #[sea_orm(
        belongs_to = "super::stock_batch::Entity",
        from = "Column::BatchId",
        to = "super::stock_batch::Column::Id"
    )]
    Batch,
}

impl Related<super::damage_return::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DamageReturn.def()
    }
}

impl Related<super::stock_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
