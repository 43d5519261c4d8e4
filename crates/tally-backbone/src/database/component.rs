use chrono::{DateTime, Utc};
use sea_orm::prelude::*;

use super::ResourceState;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub r#type: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::jobdefinition_component::Entity")]
    JobdefinitionComponent,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::jobdefinition_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobdefinitionComponent.def()
    }
}
