use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use crate::{
    database::ResourceState,
    domain::{
        self,
        ci_test::{CiTest, CiTestService},
        query::{ListQuery, Page},
    },
};

#[async_trait]
pub(crate) trait CiTestUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<CiTestData>>;
    async fn get(&self, id: &Uuid) -> Result<CiTestData>;
    async fn create(&self, name: &str) -> Result<CiTestData>;
}

pub(crate) struct CiTestUseCaseImpl {
    database_connection: Arc<DatabaseConnection>,
    ci_test_service: Arc<dyn CiTestService + Sync + Send>,
}

impl CiTestUseCaseImpl {
    pub fn new(
        database_connection: Arc<DatabaseConnection>,
        ci_test_service: Arc<dyn CiTestService + Sync + Send>,
    ) -> Self {
        Self { database_connection, ci_test_service }
    }
}

#[async_trait]
impl CiTestUseCase for CiTestUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<CiTestData>> {
        let transaction = self.database_connection.begin().await?;

        let page = self.ci_test_service.get_all(&transaction, &query).await?;

        transaction.commit().await?;

        Ok(page.map(CiTestData::from))
    }

    async fn get(&self, id: &Uuid) -> Result<CiTestData> {
        let transaction = self.database_connection.begin().await?;

        let test = self
            .ci_test_service
            .get(&transaction, id)
            .await?
            .filter(|test| test.state != ResourceState::Archived)
            .ok_or(Error::TestNotExists)?;

        transaction.commit().await?;

        Ok(test.into())
    }

    async fn create(&self, name: &str) -> Result<CiTestData> {
        let transaction = self.database_connection.begin().await?;

        let test = self.ci_test_service.create(&transaction, name).await?;

        transaction.commit().await?;

        Ok(test.into())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CiTestData {
    pub id: Uuid,
    pub name: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CiTest> for CiTestData {
    fn from(value: CiTest) -> Self {
        Self {
            id: value.id,
            name: value.name,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("test is not exists")]
    TestNotExists,
    #[error("test name already exists")]
    TestNameConflicted,
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

impl From<domain::ci_test::Error> for Error {
    fn from(value: domain::ci_test::Error) -> Self {
        use domain::ci_test::Error as E;

        match value {
            E::InvalidName => Error::InvalidPayload(value.to_string()),
            E::NameConflicted => Error::TestNameConflicted,
            E::InvalidQuery(e) => Error::InvalidQuery(e.to_string()),
            E::Anyhow(e) => Error::Anyhow(e),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
