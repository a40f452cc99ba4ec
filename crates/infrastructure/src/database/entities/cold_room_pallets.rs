use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cold_room_pallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub display_name: String,
    pub variety: String,
    pub box_type: String,
    pub size: Option<String>,
    pub grade: Option<String>,
    pub quantity: i32,
    pub supplier_ref: Option<String>,
    pub region: Option<String>,
    pub assigned_sheet: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loading_sheets::Entity",
        from = "Column::AssignedSheet",
        to = "super::loading_sheets::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    LoadingSheet,
}

impl Related<super::loading_sheets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoadingSheet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
