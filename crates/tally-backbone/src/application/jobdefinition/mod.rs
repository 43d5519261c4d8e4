use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use crate::{
    database::Persistable,
    domain::{
        self,
        jobdefinition::{Embeds, Jobdefinition, JobdefinitionService},
        query::{ListQuery, Page},
    },
};

use super::{ci_test::CiTestData, component::ComponentData};

#[async_trait]
pub(crate) trait JobdefinitionUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<JobdefinitionData>>;
    async fn get(&self, key: &str, query: ListQuery) -> Result<JobdefinitionData>;
    async fn create(&self, cmd: CreatingJobdefinitionCommand) -> Result<JobdefinitionData>;
    async fn update(&self, key: &str, if_match: &str, cmd: UpdatingJobdefinitionCommand) -> Result<String>;
    async fn delete(&self, key: &str, if_match: &str) -> Result<()>;
    async fn get_components(&self, key: &str) -> Result<Vec<ComponentData>>;
    async fn attach_component(&self, key: &str, component_id: &Uuid) -> Result<()>;
    async fn detach_component(&self, key: &str, component_id: &Uuid) -> Result<()>;
}

pub(crate) struct JobdefinitionUseCaseImpl {
    database_connection: Arc<DatabaseConnection>,
    jobdefinition_service: Arc<dyn JobdefinitionService + Sync + Send>,
}

impl JobdefinitionUseCaseImpl {
    pub fn new(
        database_connection: Arc<DatabaseConnection>,
        jobdefinition_service: Arc<dyn JobdefinitionService + Sync + Send>,
    ) -> Self {
        Self { database_connection, jobdefinition_service }
    }

    async fn find(&self, transaction: &DatabaseTransaction, key: &str, embeds: Embeds) -> Result<Jobdefinition> {
        self.jobdefinition_service.get(transaction, key, embeds).await?.ok_or(Error::JobdefinitionNotExists)
    }
}

#[async_trait]
impl JobdefinitionUseCase for JobdefinitionUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<JobdefinitionData>> {
        let transaction = self.database_connection.begin().await?;

        let page = self.jobdefinition_service.get_all(&transaction, &query).await?;

        transaction.commit().await?;

        Ok(page.map(JobdefinitionData::from))
    }

    async fn get(&self, key: &str, query: ListQuery) -> Result<JobdefinitionData> {
        let embeds = Embeds::of(&query)?;
        let transaction = self.database_connection.begin().await?;

        let jobdefinition = self.find(&transaction, key, embeds).await?;

        transaction.commit().await?;

        Ok(jobdefinition.into())
    }

    async fn create(&self, cmd: CreatingJobdefinitionCommand) -> Result<JobdefinitionData> {
        let transaction = self.database_connection.begin().await?;

        let jobdefinition = self.jobdefinition_service.create(&transaction, &cmd.name, &cmd.test_id).await?;

        transaction.commit().await?;

        Ok(jobdefinition.into())
    }

    async fn update(&self, key: &str, if_match: &str, cmd: UpdatingJobdefinitionCommand) -> Result<String> {
        let transaction = self.database_connection.begin().await?;

        let mut jobdefinition = self.find(&transaction, key, Embeds::default()).await?;
        jobdefinition.guard(if_match);
        if let Some(name) = cmd.name {
            jobdefinition.update_name(name)?;
        }
        if let Some(test_id) = cmd.test_id {
            jobdefinition.update_test(test_id);
        }
        let etag = jobdefinition.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(etag)
    }

    async fn delete(&self, key: &str, if_match: &str) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        let mut jobdefinition = self.find(&transaction, key, Embeds::default()).await?;
        jobdefinition.guard(if_match);
        jobdefinition.delete();
        jobdefinition.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(())
    }

    async fn get_components(&self, key: &str) -> Result<Vec<ComponentData>> {
        let transaction = self.database_connection.begin().await?;

        let jobdefinition = self.find(&transaction, key, Embeds::default()).await?;
        let components = self.jobdefinition_service.get_components(&transaction, &jobdefinition.id).await?;

        transaction.commit().await?;

        Ok(components.into_iter().map(ComponentData::from).collect())
    }

    async fn attach_component(&self, key: &str, component_id: &Uuid) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        let jobdefinition = self.find(&transaction, key, Embeds::default()).await?;
        self.jobdefinition_service.attach_component(&transaction, &jobdefinition.id, component_id).await?;

        transaction.commit().await?;

        Ok(())
    }

    async fn detach_component(&self, key: &str, component_id: &Uuid) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        let jobdefinition = self.find(&transaction, key, Embeds::default()).await?;
        if !self.jobdefinition_service.detach_component(&transaction, &jobdefinition.id, component_id).await? {
            return Err(Error::NotLinked);
        }

        transaction.commit().await?;

        Ok(())
    }
}

pub(crate) struct CreatingJobdefinitionCommand {
    pub name: String,
    pub test_id: Uuid,
}

#[derive(Default)]
pub(crate) struct UpdatingJobdefinitionCommand {
    pub name: Option<String>,
    pub test_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub(crate) struct JobdefinitionData {
    pub id: Uuid,
    pub name: String,
    pub test_id: Uuid,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub test: Option<CiTestData>,
    pub components: Option<Vec<ComponentData>>,
}

impl From<Jobdefinition> for JobdefinitionData {
    fn from(value: Jobdefinition) -> Self {
        Self {
            id: value.id,
            name: value.name,
            test_id: value.test_id,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            test: value.test.map(CiTestData::from),
            components: value.components.map(|components| components.into_iter().map(ComponentData::from).collect()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("jobdefinition is not exists")]
    JobdefinitionNotExists,
    #[error("jobdefinition was modified concurrently")]
    Conflict,
    #[error("jobdefinition name already exists")]
    JobdefinitionNameConflicted,
    #[error("component is already attached to jobdefinition")]
    AlreadyLinked,
    #[error("component is not attached to jobdefinition")]
    NotLinked,
    #[error("referenced test or component does not exist")]
    IntegrityViolation,
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

impl From<domain::jobdefinition::Error> for Error {
    fn from(value: domain::jobdefinition::Error) -> Self {
        use domain::jobdefinition::Error as E;

        match value {
            E::InvalidName => Error::InvalidPayload(value.to_string()),
            E::Conflict => Error::Conflict,
            E::NameConflicted => Error::JobdefinitionNameConflicted,
            E::AlreadyLinked => Error::AlreadyLinked,
            E::IntegrityViolation => Error::IntegrityViolation,
            E::InvalidQuery(e) => Error::InvalidQuery(e.to_string()),
            E::Anyhow(e) => Error::Anyhow(e),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::{Error, JobdefinitionUseCase, JobdefinitionUseCaseImpl, UpdatingJobdefinitionCommand};
    use crate::domain::{
        jobdefinition::{test::jobdefinition_model, Embeds, Jobdefinition, MockJobdefinitionService},
        query::ListQuery,
    };

    fn use_case(mock_database: MockDatabase, jobdefinition_service: MockJobdefinitionService) -> JobdefinitionUseCaseImpl {
        JobdefinitionUseCaseImpl::new(Arc::new(mock_database.into_connection()), Arc::new(jobdefinition_service))
    }

    #[tokio::test]
    async fn when_getting_with_embeds_then_use_case_forwards_them_to_service() {
        let mut jobdefinition_service = MockJobdefinitionService::new();
        jobdefinition_service
            .expect_get()
            .withf(|_, key, embeds| key == "nightly" && *embeds == Embeds { test: true, components: false })
            .times(1)
            .returning(|_, _, _| Ok(Some(Jobdefinition::from(jobdefinition_model("nightly")))));
        let query = ListQuery::parse(None, None, None, None, Some("test")).unwrap();

        let result = use_case(MockDatabase::new(DatabaseBackend::Postgres), jobdefinition_service)
            .get("nightly", query)
            .await;

        assert_eq!(result.expect("getting jobdefinition should be successful").name, "nightly");
    }

    #[tokio::test]
    async fn when_jobdefinition_does_not_exist_then_get_returns_jobdefinition_not_exists_err() {
        let mut jobdefinition_service = MockJobdefinitionService::new();
        jobdefinition_service.expect_get().times(1).returning(|_, _, _| Ok(None));

        let result = use_case(MockDatabase::new(DatabaseBackend::Postgres), jobdefinition_service)
            .get("missing", ListQuery::default())
            .await;

        assert!(matches!(result, Err(Error::JobdefinitionNotExists)));
    }

    #[tokio::test]
    async fn when_etag_is_stale_then_update_returns_conflict_err() {
        let mut jobdefinition_service = MockJobdefinitionService::new();
        jobdefinition_service
            .expect_get()
            .times(1)
            .returning(|_, _, _| Ok(Some(Jobdefinition::from(jobdefinition_model("nightly")))));
        let mock_database = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }]);

        let result = use_case(mock_database, jobdefinition_service)
            .update(
                "nightly",
                "stale",
                UpdatingJobdefinitionCommand { name: Some("weekly".to_owned()), ..Default::default() },
            )
            .await;

        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn when_component_is_not_linked_then_detach_returns_not_linked_err() {
        let model = jobdefinition_model("nightly");
        let jobdefinition_id = model.id;
        let mut jobdefinition_service = MockJobdefinitionService::new();
        jobdefinition_service.expect_get().times(1).returning(move |_, _, _| Ok(Some(Jobdefinition::from(model.clone()))));
        jobdefinition_service
            .expect_detach_component()
            .withf(move |_, id, _| id == &jobdefinition_id)
            .times(1)
            .returning(|_, _, _| Ok(false));

        let result = use_case(MockDatabase::new(DatabaseBackend::Postgres), jobdefinition_service)
            .detach_component("nightly", &Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(Error::NotLinked)));
    }
}
