use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loading_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sheet_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub sequence: i32,
    #[sea_orm(unique)]
    pub pallet_id: Option<String>,
    pub variety: String,
    pub box_type: String,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loading_sheets::Entity",
        from = "Column::SheetId",
        to = "super::loading_sheets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    LoadingSheet,
}

impl Related<super::loading_sheets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoadingSheet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
