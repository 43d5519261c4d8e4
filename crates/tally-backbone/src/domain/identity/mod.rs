use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set,
};
use tally_auth::{
    auth::{AuthError, Authenticator, Credentials},
    Principal, RoleLabel,
};
use tally_common::{gen_etag, validate_name};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::{constraint_violation, role, team, user, ConstraintViolation, ResourceState};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct User {
    pub id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub team_id: Uuid,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) struct NewUser {
    pub name: String,
    pub password: String,
    pub role_id: Uuid,
    pub team_id: Uuid,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait UserService {
    async fn get_by_name(&self, transaction: &DatabaseTransaction, name: &str) -> Result<Option<User>>;
    async fn create(&self, transaction: &DatabaseTransaction, new_user: NewUser) -> Result<User>;
}

pub(crate) struct PostgresUserService;

#[async_trait]
impl UserService for PostgresUserService {
    async fn get_by_name(&self, transaction: &DatabaseTransaction, name: &str) -> Result<Option<User>> {
        use user::{Column, Entity};

        let model = Entity::find().filter(Column::Name.eq(name)).one(transaction).await?;

        Ok(model.map(User::from))
    }

    async fn create(&self, transaction: &DatabaseTransaction, new_user: NewUser) -> Result<User> {
        if !validate_name(&new_user.name) {
            return Err(Error::InvalidName);
        }
        if new_user.password.is_empty() {
            return Err(Error::InvalidPassword);
        }

        let password = hash_password(&new_user.password)?;
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_user.name),
            password: Set(password),
            role_id: Set(new_user.role_id),
            team_id: Set(new_user.team_id),
            state: Set(ResourceState::Active),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("user(id: {}, name: {}) created.", model.id, model.name);

        Ok(model.into())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}").into())
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Resolves Basic credentials into a principal by checking them against `users`.
pub(crate) struct PostgresAuthenticator {
    connection: Arc<DatabaseConnection>,
}

impl PostgresAuthenticator {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    async fn resolve<C: ConnectionTrait>(
        &self,
        connection: &C,
        credentials: &Credentials,
    ) -> std::result::Result<Option<Principal>, DbErr> {
        let Some(user) = user::Entity::find()
            .filter(user::Column::Name.eq(credentials.username.as_str()))
            .filter(user::Column::State.eq(ResourceState::Active))
            .one(connection)
            .await?
        else {
            return Ok(None);
        };

        if !verify_password(&user.password, &credentials.password) {
            return Ok(None);
        }

        let Some(role) = role::Entity::find_by_id(user.role_id).one(connection).await? else {
            return Ok(None);
        };
        let role_label = RoleLabel::from(role.label);

        let mut teams = vec![user.team_id];
        if role_label == RoleLabel::ProductOwner {
            let children: Vec<Uuid> = team::Entity::find()
                .select_only()
                .column(team::Column::Id)
                .filter(team::Column::ParentId.eq(user.team_id))
                .filter(team::Column::State.ne(ResourceState::Archived))
                .into_tuple()
                .all(connection)
                .await?;
            teams.extend(children);
        }

        Ok(Some(Principal {
            id: user.id,
            name: user.name,
            role_id: user.role_id,
            role: role_label,
            team_id: user.team_id,
            teams,
        }))
    }
}

#[async_trait]
impl Authenticator for PostgresAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> std::result::Result<Principal, AuthError> {
        match self.resolve(self.connection.as_ref(), credentials).await {
            Ok(Some(principal)) => Ok(principal),
            Ok(None) => {
                debug!("rejected credentials of user {}", credentials.username);
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => Err(AuthError::PrincipalResolution(e.to_string())),
        }
    }
}

impl From<user::Model> for User {
    fn from(value: user::Model) -> Self {
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

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid user name")]
    InvalidName,
    #[error("password must not be empty")]
    InvalidPassword,
    #[error("user name already exists")]
    NameConflicted,
    #[error("referenced role or team does not exist")]
    IntegrityViolation,
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        match constraint_violation(&value) {
            Some(ConstraintViolation::Unique) => Self::NameConflicted,
            Some(ConstraintViolation::ForeignKey) => Self::IntegrityViolation,
            None => Self::Anyhow(value.into()),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
