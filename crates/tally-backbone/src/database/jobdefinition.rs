use chrono::{DateTime, Utc};
use sea_orm::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobdefinitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub test_id: Uuid,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "super::ci_test::Entity", from = "Column::TestId", to = "super::ci_test::Column::Id")]
    Test,
    #[sea_orm(has_many = "super::jobdefinition_component::Entity")]
    JobdefinitionComponent,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::ci_test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Test.def()
    }
}

impl Related<super::component::Entity> for Entity {
    fn to() -> RelationDef {
        super::jobdefinition_component::Relation::Component.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::jobdefinition_component::Relation::Jobdefinition.def().rev())
    }
}
