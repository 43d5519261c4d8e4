use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    sea_query::StringLen, ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr, DeriveActiveEnum,
    EntityTrait, EnumIter, SqlErr,
};
use serde::{Deserialize, Serialize};
use url::Url;

pub(crate) mod ci_test;
pub(crate) mod component;
pub(crate) mod feeder;
pub(crate) mod jobdefinition;
pub(crate) mod jobdefinition_component;
mod migration;
pub(crate) mod permission;
pub(crate) mod role;
pub(crate) mod role_permission;
pub(crate) mod team;
pub(crate) mod user;

pub(crate) use migration::migrate;

pub(crate) struct DatabaseCredential {
    pub username: String,
    pub password: Option<String>,
}

pub async fn connect_to_database(
    host: &str,
    port: u16,
    database_name: &str,
    credential: &DatabaseCredential,
) -> anyhow::Result<Arc<DatabaseConnection>> {
    let mut conn_str = Url::parse(&format!("postgres://{host}:{port}/{database_name}?sslmode=prefer"))?;
    conn_str
        .set_username(&credential.username)
        .map_err(|_| anyhow::anyhow!("database username cannot be set on {host}"))?;
    conn_str
        .set_password(credential.password.as_deref())
        .map_err(|_| anyhow::anyhow!("database password cannot be set on {host}"))?;

    let mut options = ConnectOptions::new(conn_str);
    options.sqlx_logging_level(tracing::log::LevelFilter::Debug);

    Ok(Arc::new(Database::connect(options).await?))
}

/// Domain objects that buffer changes and write them back in one statement.
#[async_trait]
pub(crate) trait Persistable {
    type Error;

    /// Returns the etag the row carries once the pending changes are written.
    async fn persist(self, transaction: &DatabaseTransaction) -> Result<String, Self::Error>;
}

#[derive(EnumIter, DeriveActiveEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum ResourceState {
    Active,
    Inactive,
    Archived,
}

/// Tables whose rows carry an etag and a lifecycle state.
pub(crate) trait Versioned: EntityTrait {
    fn id_column() -> Self::Column;
    fn etag_column() -> Self::Column;
    fn state_column() -> Self::Column;
}

macro_rules! versioned {
    ($($entity:ident),+) => {
        $(
            impl Versioned for $entity::Entity {
                fn id_column() -> Self::Column {
                    $entity::Column::Id
                }

                fn etag_column() -> Self::Column {
                    $entity::Column::Etag
                }

                fn state_column() -> Self::Column {
                    $entity::Column::State
                }
            }
        )+
    };
}

versioned!(feeder, role, permission);

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ConstraintViolation {
    Unique,
    ForeignKey,
}

pub(crate) fn constraint_violation(err: &DbErr) -> Option<ConstraintViolation> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Some(ConstraintViolation::Unique),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => Some(ConstraintViolation::ForeignKey),
        _ => None,
    }
}
