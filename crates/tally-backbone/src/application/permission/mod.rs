use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use crate::{
    database::{Persistable, ResourceState},
    domain::{
        self,
        permission::{NewPermission, Permission, PermissionService},
        query::{ListQuery, Page},
    },
};

#[async_trait]
pub(crate) trait PermissionUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<PermissionData>>;
    async fn get(&self, id: &Uuid) -> Result<PermissionData>;
    async fn create(&self, cmd: CreatingPermissionCommand) -> Result<PermissionData>;
    async fn update(&self, id: &Uuid, if_match: &str, cmd: UpdatingPermissionCommand) -> Result<String>;
    async fn delete(&self, id: &Uuid, if_match: &str) -> Result<()>;
}

pub(crate) struct PermissionUseCaseImpl {
    database_connection: Arc<DatabaseConnection>,
    permission_service: Arc<dyn PermissionService + Sync + Send>,
}

impl PermissionUseCaseImpl {
    pub fn new(
        database_connection: Arc<DatabaseConnection>,
        permission_service: Arc<dyn PermissionService + Sync + Send>,
    ) -> Self {
        Self { database_connection, permission_service }
    }
}

#[async_trait]
impl PermissionUseCase for PermissionUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<PermissionData>> {
        let transaction = self.database_connection.begin().await?;

        let page = self.permission_service.get_all(&transaction, &query).await?;

        transaction.commit().await?;

        Ok(page.map(PermissionData::from))
    }

    async fn get(&self, id: &Uuid) -> Result<PermissionData> {
        let transaction = self.database_connection.begin().await?;

        let permission = self
            .permission_service
            .get(&transaction, id)
            .await?
            .filter(|permission| !permission.is_archived())
            .ok_or(Error::PermissionNotExists)?;

        transaction.commit().await?;

        Ok(permission.into())
    }

    async fn create(&self, cmd: CreatingPermissionCommand) -> Result<PermissionData> {
        let transaction = self.database_connection.begin().await?;

        let permission = self
            .permission_service
            .create(&transaction, NewPermission { name: cmd.name, label: cmd.label, description: cmd.description })
            .await?;

        transaction.commit().await?;

        Ok(permission.into())
    }

    async fn update(&self, id: &Uuid, if_match: &str, cmd: UpdatingPermissionCommand) -> Result<String> {
        let transaction = self.database_connection.begin().await?;

        let mut permission =
            self.permission_service.get(&transaction, id).await?.ok_or(Error::PermissionNotExists)?;
        permission.guard(if_match);
        if let Some(name) = cmd.name {
            permission.update_name(name)?;
        }
        if let Some(description) = cmd.description {
            permission.update_description(Some(description));
        }
        let etag = permission.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(etag)
    }

    async fn delete(&self, id: &Uuid, if_match: &str) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        let mut permission =
            self.permission_service.get(&transaction, id).await?.ok_or(Error::PermissionNotExists)?;
        permission.guard(if_match);
        permission.archive();
        permission.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(())
    }
}

pub(crate) struct CreatingPermissionCommand {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub(crate) struct UpdatingPermissionCommand {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PermissionData {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Permission> for PermissionData {
    fn from(value: Permission) -> Self {
        Self {
            id: value.id,
            name: value.name,
            label: value.label,
            description: value.description,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("permission is not exists")]
    PermissionNotExists,
    #[error("permission was modified concurrently or is archived")]
    Conflict,
    #[error("permission label already exists")]
    PermissionLabelConflicted,
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

impl From<domain::permission::Error> for Error {
    fn from(value: domain::permission::Error) -> Self {
        use domain::permission::Error as E;

        match value {
            E::InvalidName | E::InvalidLabel => Error::InvalidPayload(value.to_string()),
            E::Conflict => Error::Conflict,
            E::NameConflicted => Error::PermissionLabelConflicted,
            E::InvalidQuery(e) => Error::InvalidQuery(e.to_string()),
            E::Anyhow(e) => Error::Anyhow(e),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    use super::{Error, PermissionUseCase, PermissionUseCaseImpl, UpdatingPermissionCommand};
    use crate::domain::permission::MockPermissionService;

    #[tokio::test]
    async fn when_deleting_missing_permission_then_use_case_returns_permission_not_exists_err() {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mut permission_service = MockPermissionService::new();
        permission_service.expect_get().times(1).returning(|_, _| Ok(None));

        let use_case = PermissionUseCaseImpl::new(mock_connection, Arc::new(permission_service));

        assert!(matches!(use_case.delete(&Uuid::new_v4(), "etag").await, Err(Error::PermissionNotExists)));
    }

    #[tokio::test]
    async fn when_updating_missing_permission_then_use_case_returns_permission_not_exists_err() {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mut permission_service = MockPermissionService::new();
        permission_service.expect_get().times(1).returning(|_, _| Ok(None));

        let use_case = PermissionUseCaseImpl::new(mock_connection, Arc::new(permission_service));
        let result = use_case.update(&Uuid::new_v4(), "etag", UpdatingPermissionCommand::default()).await;

        assert!(matches!(result, Err(Error::PermissionNotExists)));
    }
}
