use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tally_auth::Principal;
use uuid::Uuid;

use crate::{
    database::{Persistable, ResourceState},
    domain::{
        self,
        query::{ListQuery, Page},
        role::{NewRole, Role, RoleService, RoleVisibility, EMBEDS},
    },
};

use super::permission::PermissionData;

#[async_trait]
pub(crate) trait RoleUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<RoleData>>;
    async fn get(&self, id: &Uuid, query: ListQuery) -> Result<RoleData>;
    async fn create(&self, cmd: CreatingRoleCommand) -> Result<RoleData>;
    async fn update(&self, id: &Uuid, if_match: &str, cmd: UpdatingRoleCommand) -> Result<String>;
    async fn delete(&self, id: &Uuid, if_match: &str) -> Result<()>;
    async fn get_archived(&self) -> Result<Vec<RoleData>>;
    async fn purge(&self) -> Result<()>;
    async fn attach_permission(&self, id: &Uuid, permission_id: &Uuid) -> Result<()>;
    async fn detach_permission(&self, id: &Uuid, permission_id: &Uuid) -> Result<()>;
}

pub(crate) struct RoleUseCaseImpl {
    principal: Principal,
    database_connection: Arc<DatabaseConnection>,
    role_service: Arc<dyn RoleService + Sync + Send>,
}

impl RoleUseCaseImpl {
    pub fn new(
        principal: Principal,
        database_connection: Arc<DatabaseConnection>,
        role_service: Arc<dyn RoleService + Sync + Send>,
    ) -> Self {
        Self { principal, database_connection, role_service }
    }
}

#[async_trait]
impl RoleUseCase for RoleUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<RoleData>> {
        let transaction = self.database_connection.begin().await?;

        let page = self.role_service.get_all(&transaction, &query, RoleVisibility::of(&self.principal)).await?;

        transaction.commit().await?;

        Ok(page.map(RoleData::from))
    }

    async fn get(&self, id: &Uuid, query: ListQuery) -> Result<RoleData> {
        query.ensure_embeds(EMBEDS).map_err(|e| Error::InvalidQuery(e.to_string()))?;
        let transaction = self.database_connection.begin().await?;

        let role = self
            .role_service
            .get(&transaction, id, query.embeds("permissions"))
            .await?
            .filter(|role| !role.is_archived())
            .ok_or(Error::RoleNotExists)?;
        if !RoleVisibility::of(&self.principal).allows(&role) {
            return Err(Error::Unauthorized);
        }

        transaction.commit().await?;

        Ok(role.into())
    }

    async fn create(&self, cmd: CreatingRoleCommand) -> Result<RoleData> {
        let transaction = self.database_connection.begin().await?;

        let role = self
            .role_service
            .create(&transaction, NewRole { name: cmd.name, label: cmd.label, description: cmd.description })
            .await?;

        transaction.commit().await?;

        Ok(role.into())
    }

    async fn update(&self, id: &Uuid, if_match: &str, cmd: UpdatingRoleCommand) -> Result<String> {
        let transaction = self.database_connection.begin().await?;

        let mut role = self.role_service.get(&transaction, id, false).await?.ok_or(Error::RoleNotExists)?;
        role.guard(if_match);
        if let Some(name) = cmd.name {
            role.update_name(name)?;
        }
        if let Some(description) = cmd.description {
            role.update_description(Some(description));
        }
        let etag = role.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(etag)
    }

    async fn delete(&self, id: &Uuid, if_match: &str) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        let mut role = self.role_service.get(&transaction, id, false).await?.ok_or(Error::RoleNotExists)?;
        role.guard(if_match);
        role.archive();
        role.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(())
    }

    async fn get_archived(&self) -> Result<Vec<RoleData>> {
        let transaction = self.database_connection.begin().await?;

        let roles = self.role_service.get_archived(&transaction).await?;

        transaction.commit().await?;

        Ok(roles.into_iter().map(RoleData::from).collect())
    }

    async fn purge(&self) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        self.role_service.purge(&transaction).await?;

        transaction.commit().await?;

        Ok(())
    }

    async fn attach_permission(&self, id: &Uuid, permission_id: &Uuid) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        self.role_service
            .get(&transaction, id, false)
            .await?
            .filter(|role| !role.is_archived())
            .ok_or(Error::RoleNotExists)?;
        self.role_service.attach_permission(&transaction, id, permission_id).await?;

        transaction.commit().await?;

        Ok(())
    }

    async fn detach_permission(&self, id: &Uuid, permission_id: &Uuid) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        self.role_service.get(&transaction, id, false).await?.ok_or(Error::RoleNotExists)?;
        if !self.role_service.detach_permission(&transaction, id, permission_id).await? {
            return Err(Error::NotLinked);
        }

        transaction.commit().await?;

        Ok(())
    }
}

pub(crate) struct CreatingRoleCommand {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub(crate) struct UpdatingRoleCommand {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RoleData {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub permissions: Option<Vec<PermissionData>>,
}

impl From<Role> for RoleData {
    fn from(value: Role) -> Self {
        Self {
            id: value.id,
            name: value.name,
            label: value.label,
            description: value.description,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            permissions: value.permissions.map(|permissions| permissions.into_iter().map(PermissionData::from).collect()),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("role is not exists")]
    RoleNotExists,
    #[error("role is not visible to principal")]
    Unauthorized,
    #[error("role was modified concurrently or is archived")]
    Conflict,
    #[error("role label already exists")]
    RoleLabelConflicted,
    #[error("permission is already attached to role")]
    AlreadyLinked,
    #[error("permission is not attached to role")]
    NotLinked,
    #[error("referenced permission does not exist")]
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

impl From<domain::role::Error> for Error {
    fn from(value: domain::role::Error) -> Self {
        use domain::role::Error as E;

        match value {
            E::InvalidName | E::InvalidLabel => Error::InvalidPayload(value.to_string()),
            E::Conflict => Error::Conflict,
            E::NameConflicted => Error::RoleLabelConflicted,
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

    use sea_orm::{DatabaseBackend, MockDatabase};
    use tally_auth::{Principal, RoleLabel};
    use uuid::Uuid;

    use super::{Error, RoleUseCase, RoleUseCaseImpl};
    use crate::{
        application::test::principal,
        domain::{
            query::{ListQuery, Page},
            role::{test::role_model, MockRoleService, Role, RoleVisibility},
        },
    };

    fn use_case(principal: Principal, role_service: MockRoleService) -> RoleUseCaseImpl {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        RoleUseCaseImpl::new(principal, mock_connection, Arc::new(role_service))
    }

    #[tokio::test]
    async fn when_admin_lists_roles_then_visibility_hides_super_admin_and_product_owner() {
        let mut role_service = MockRoleService::new();
        role_service
            .expect_get_all()
            .withf(|_, _, visibility| {
                visibility == &RoleVisibility::AllBut(vec!["SUPER_ADMIN".to_owned(), "PRODUCT_OWNER".to_owned()])
            })
            .times(1)
            .returning(|_, _, _| Ok(Page { items: vec![Role::from(role_model("User", "USER"))], count: 1 }));

        let result = use_case(principal(RoleLabel::Admin, Uuid::new_v4()), role_service).get_all(ListQuery::default()).await;

        assert_eq!(result.expect("listing roles should be successful").items[0].label, "USER");
    }

    #[tokio::test]
    async fn when_user_gets_foreign_role_then_use_case_returns_unauthorized_err() {
        let mut role_service = MockRoleService::new();
        role_service.expect_get().times(1).returning(|_, _, _| Ok(Some(Role::from(role_model("Admin", "ADMIN")))));

        let result =
            use_case(principal(RoleLabel::User, Uuid::new_v4()), role_service).get(&Uuid::new_v4(), ListQuery::default()).await;

        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn when_permission_is_not_linked_then_detaching_returns_not_linked_err() {
        let mut role_service = MockRoleService::new();
        role_service.expect_get().times(1).returning(|_, _, _| Ok(Some(Role::from(role_model("Admin", "ADMIN")))));
        role_service.expect_detach_permission().times(1).returning(|_, _, _| Ok(false));

        let result = use_case(principal(RoleLabel::SuperAdmin, Uuid::new_v4()), role_service)
            .detach_permission(&Uuid::new_v4(), &Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(Error::NotLinked)));
    }

    #[tokio::test]
    async fn when_role_does_not_exist_then_deleting_returns_role_not_exists_err() {
        let mut role_service = MockRoleService::new();
        role_service.expect_get().times(1).returning(|_, _, _| Ok(None));

        let result =
            use_case(principal(RoleLabel::SuperAdmin, Uuid::new_v4()), role_service).delete(&Uuid::new_v4(), "e").await;

        assert!(matches!(result, Err(Error::RoleNotExists)));
    }
}
