use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loading_sheets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub exporter: String,
    pub client: Option<String>,
    pub shipping_line: Option<String>,
    pub bill_number: String,
    pub container: String,
    pub line_seal: Option<String>,
    pub exporter_seal: Option<String>,
    pub truck: Option<String>,
    pub vessel: Option<String>,
    pub temp_setpoint: Option<String>,
    pub temp_recorded: Option<String>,
    pub loading_date: Date,
    pub loaded_by: Option<String>,
    pub checked_by: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub assigned_carrier: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::carriers::Entity",
        from = "Column::AssignedCarrier",
        to = "super::carriers::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Carrier,
    #[sea_orm(has_many = "super::loading_line_items::Entity")]
    LineItems,
    #[sea_orm(has_many = "super::cold_room_pallets::Entity")]
    Pallets,
}

impl Related<super::carriers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carrier.def()
    }
}

impl Related<super::loading_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl Related<super::cold_room_pallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
