use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use crate::{
    database::ResourceState,
    domain::{
        self,
        component::{Component, ComponentService},
        query::{ListQuery, Page},
    },
};

#[async_trait]
pub(crate) trait ComponentUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<ComponentData>>;
    async fn get(&self, id: &Uuid) -> Result<ComponentData>;
    async fn create(&self, name: &str, component_type: &str) -> Result<ComponentData>;
}

pub(crate) struct ComponentUseCaseImpl {
    database_connection: Arc<DatabaseConnection>,
    component_service: Arc<dyn ComponentService + Sync + Send>,
}

impl ComponentUseCaseImpl {
    pub fn new(
        database_connection: Arc<DatabaseConnection>,
        component_service: Arc<dyn ComponentService + Sync + Send>,
    ) -> Self {
        Self { database_connection, component_service }
    }
}

#[async_trait]
impl ComponentUseCase for ComponentUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<ComponentData>> {
        let transaction = self.database_connection.begin().await?;

        let page = self.component_service.get_all(&transaction, &query).await?;

        transaction.commit().await?;

        Ok(page.map(ComponentData::from))
    }

    async fn get(&self, id: &Uuid) -> Result<ComponentData> {
        let transaction = self.database_connection.begin().await?;

        let component = self
            .component_service
            .get(&transaction, id)
            .await?
            .filter(|component| component.state != ResourceState::Archived)
            .ok_or(Error::ComponentNotExists)?;

        transaction.commit().await?;

        Ok(component.into())
    }

    async fn create(&self, name: &str, component_type: &str) -> Result<ComponentData> {
        let transaction = self.database_connection.begin().await?;

        let component = self.component_service.create(&transaction, name, component_type).await?;

        transaction.commit().await?;

        Ok(component.into())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ComponentData {
    pub id: Uuid,
    pub name: String,
    pub component_type: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Component> for ComponentData {
    fn from(value: Component) -> Self {
        Self {
            id: value.id,
            name: value.name,
            component_type: value.component_type,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("component is not exists")]
    ComponentNotExists,
    #[error("component name already exists")]
    ComponentNameConflicted,
    #[error("{0}")]
    InvalidPayload(String),
    #[error("{0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Error::Anyhow(value.into())
    }
}

impl From<domain::component::Error> for Error {
    fn from(value: domain::component::Error) -> Self {
        use domain::component::Error as E;

        match value {
            E::InvalidName => Error::InvalidPayload(value.to_string()),
            E::NameConflicted => Error::ComponentNameConflicted,
            E::InvalidQuery(e) => Error::InvalidQuery(e.to_string()),
            E::Anyhow(e) => Error::Anyhow(e),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
