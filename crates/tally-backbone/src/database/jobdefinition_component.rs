use sea_orm::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobdefinition_components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub jobdefinition_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub component_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::jobdefinition::Entity",
        from = "Column::JobdefinitionId",
        to = "super::jobdefinition::Column::Id"
    )]
    Jobdefinition,
    #[sea_orm(
        belongs_to = "super::component::Entity",
        from = "Column::ComponentId",
        to = "super::component::Column::Id"
    )]
    Component,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::jobdefinition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jobdefinition.def()
    }
}

impl Related<super::component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}
