use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tally_auth::{Principal, RoleLabel};
use uuid::Uuid;

use crate::{
    database::ResourceState,
    domain::{
        self,
        identity::{NewUser, User, UserService},
    },
};

#[async_trait]
pub(crate) trait UserUseCase {
    async fn create(&self, cmd: CreatingUserCommand) -> Result<UserData>;
    fn identity(&self) -> IdentityData;
}

pub(crate) struct UserUseCaseImpl {
    principal: Principal,
    database_connection: Arc<DatabaseConnection>,
    user_service: Arc<dyn UserService + Sync + Send>,
}

impl UserUseCaseImpl {
    pub fn new(
        principal: Principal,
        database_connection: Arc<DatabaseConnection>,
        user_service: Arc<dyn UserService + Sync + Send>,
    ) -> Self {
        Self { principal, database_connection, user_service }
    }
}

#[async_trait]
impl UserUseCase for UserUseCaseImpl {
    async fn create(&self, cmd: CreatingUserCommand) -> Result<UserData> {
        let transaction = self.database_connection.begin().await?;

        let user = self
            .user_service
            .create(
                &transaction,
                NewUser { name: cmd.name, password: cmd.password, role_id: cmd.role_id, team_id: cmd.team_id },
            )
            .await?;

        transaction.commit().await?;

        Ok(user.into())
    }

    fn identity(&self) -> IdentityData {
        IdentityData::from(&self.principal)
    }
}

pub(crate) struct CreatingUserCommand {
    pub name: String,
    pub password: String,
    pub role_id: Uuid,
    pub team_id: Uuid,
}

#[derive(Debug, Clone)]
pub(crate) struct UserData {
    pub id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub team_id: Uuid,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserData {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            role_id: value.role_id,
            team_id: value.team_id,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// The caller as resolved by authentication.
#[derive(Debug, Clone)]
pub(crate) struct IdentityData {
    pub id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub role_label: RoleLabel,
    pub team_id: Uuid,
    pub teams: Vec<Uuid>,
}

impl From<&Principal> for IdentityData {
    fn from(value: &Principal) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            role_id: value.role_id,
            role_label: value.role.clone(),
            team_id: value.team_id,
            teams: value.teams.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("user name already exists")]
    UserNameConflicted,
    #[error("referenced role or team does not exist")]
    IntegrityViolation,
    #[error("{0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Error::Anyhow(value.into())
    }
}

impl From<domain::identity::Error> for Error {
    fn from(value: domain::identity::Error) -> Self {
        use domain::identity::Error as E;

        match value {
            E::InvalidName | E::InvalidPassword => Error::InvalidPayload(value.to_string()),
            E::NameConflicted => Error::UserNameConflicted,
            E::IntegrityViolation => Error::IntegrityViolation,
            E::Anyhow(e) => Error::Anyhow(e),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tally_auth::RoleLabel;
    use uuid::Uuid;

    use super::{CreatingUserCommand, Error, UserUseCase, UserUseCaseImpl};
    use crate::{
        application::test::principal,
        database::ResourceState,
        domain::identity::{self, MockUserService, User},
    };

    fn use_case(user_service: MockUserService) -> UserUseCaseImpl {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        UserUseCaseImpl::new(principal(RoleLabel::SuperAdmin, Uuid::new_v4()), mock_connection, Arc::new(user_service))
    }

    fn command(name: &str) -> CreatingUserCommand {
        CreatingUserCommand {
            name: name.to_owned(),
            password: "s3cret".to_owned(),
            role_id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn when_creating_user_then_use_case_returns_user_data() {
        let mut user_service = MockUserService::new();
        user_service.expect_create().withf(|_, new_user| new_user.name == "jdoe").times(1).returning(|_, new_user| {
            let now = Utc::now();
            Ok(User {
                id: Uuid::new_v4(),
                name: new_user.name,
                role_id: new_user.role_id,
                team_id: new_user.team_id,
                state: ResourceState::Active,
                etag: "e1".to_owned(),
                created_at: now,
                updated_at: now,
            })
        });

        let result = use_case(user_service).create(command("jdoe")).await;

        assert_eq!(result.expect("creating user should be successful").name, "jdoe");
    }

    #[tokio::test]
    async fn when_user_name_is_taken_then_use_case_returns_user_name_conflicted_err() {
        let mut user_service = MockUserService::new();
        user_service.expect_create().times(1).returning(|_, _| Err(identity::Error::NameConflicted));

        let result = use_case(user_service).create(command("jdoe")).await;

        assert!(matches!(result, Err(Error::UserNameConflicted)));
    }

    #[test]
    fn when_asking_identity_then_use_case_returns_the_principal() {
        let use_case = use_case(MockUserService::new());

        let identity = use_case.identity();

        assert_eq!(identity.role_label, RoleLabel::SuperAdmin);
        assert_eq!(identity.teams, vec![identity.team_id]);
    }
}
