use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carriers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loading_sheets::Entity")]
    LoadingSheets,
}

impl Related<super::loading_sheets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoadingSheets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
