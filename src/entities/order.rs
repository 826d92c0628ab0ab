use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// A field-sales order against a DSR and route.
///
/// `total = subtotal - discount` always; totals are a pure function of the
/// items except through the settlement engine's explicit adjustment trail.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// `WO-<year>-NNNN`, sequence monotonic per year, zero-padded to 4.
    #[sea_orm(unique)]
    #[validate(length(min = 1, max = 50))]
    pub order_number: String,

    pub dsr_id: Uuid,
    pub route_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub payment_status: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Two-state order lifecycle: settlement flips `pending` to `adjusted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Adjusted,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::dsr::Entity",
        from = "Column::DsrId",
        to = "super::dsr::Column::Id"
    )]
    Dsr,
    #[sea_orm(
        belongs_to = "super::route::Entity",
        from = "Column::RouteId",
        to = "super::route::Column::Id"
    )]
    Route,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::dsr::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dsr.def()
    }
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Route.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
