use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tally_common::{gen_etag, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{component, constraint_violation, ConstraintViolation, ResourceState};

use super::query::{ListQuery, Page, QueryError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Component {
    pub id: Uuid,
    pub name: String,
    pub component_type: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait ComponentService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<Component>>;
    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<Component>>;
    async fn create(&self, transaction: &DatabaseTransaction, name: &str, component_type: &str) -> Result<Component>;
}

pub(crate) struct PostgresComponentService;

#[async_trait]
impl ComponentService for PostgresComponentService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<Component>> {
        use component::{Column, Entity};

        let select = query.apply(Entity::find(), &[])?.filter(Column::State.ne(ResourceState::Archived));
        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        Ok(Page { items: models.into_iter().map(Component::from).collect(), count })
    }

    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<Component>> {
        Ok(component::Entity::find_by_id(*id).one(transaction).await?.map(Component::from))
    }

    async fn create(&self, transaction: &DatabaseTransaction, name: &str, component_type: &str) -> Result<Component> {
        if !validate_name(name) || !validate_name(component_type) {
            return Err(Error::InvalidName);
        }

        let now = Utc::now();
        let model = component::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_owned()),
            r#type: Set(component_type.to_owned()),
            state: Set(ResourceState::Active),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("component(id: {}, name: {name}, type: {component_type}) created.", model.id);

        Ok(model.into())
    }
}

impl From<component::Model> for Component {
    fn from(value: component::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            component_type: value.r#type,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid component name or type")]
    InvalidName,
    #[error("component name already exists")]
    NameConflicted,
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        match constraint_violation(&value) {
            Some(ConstraintViolation::Unique) => Self::NameConflicted,
            _ => Self::Anyhow(value.into()),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
