use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tally_common::{gen_etag, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{ci_test, constraint_violation, ConstraintViolation, ResourceState};

use super::query::{ListQuery, Page, QueryError};

/// A test suite jobdefinitions run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CiTest {
    pub id: Uuid,
    pub name: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait CiTestService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<CiTest>>;
    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<CiTest>>;
    async fn create(&self, transaction: &DatabaseTransaction, name: &str) -> Result<CiTest>;
}

pub(crate) struct PostgresCiTestService;

#[async_trait]
impl CiTestService for PostgresCiTestService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<CiTest>> {
        use ci_test::{Column, Entity};

        let select = query.apply(Entity::find(), &[])?.filter(Column::State.ne(ResourceState::Archived));
        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        Ok(Page { items: models.into_iter().map(CiTest::from).collect(), count })
    }

    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<CiTest>> {
        Ok(ci_test::Entity::find_by_id(*id).one(transaction).await?.map(CiTest::from))
    }

    async fn create(&self, transaction: &DatabaseTransaction, name: &str) -> Result<CiTest> {
        if !validate_name(name) {
            return Err(Error::InvalidName);
        }

        let now = Utc::now();
        let model = ci_test::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_owned()),
            state: Set(ResourceState::Active),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("test(id: {}, name: {name}) created.", model.id);

        Ok(model.into())
    }
}

impl From<ci_test::Model> for CiTest {
    fn from(value: ci_test::Model) -> Self {
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
    #[error("invalid test name")]
    InvalidName,
    #[error("test name already exists")]
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

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, TransactionTrait};
    use uuid::Uuid;

    use super::{CiTestService, Error, PostgresCiTestService};
    use crate::database::{ci_test::Model, ResourceState};

    #[tokio::test]
    async fn when_creating_test_then_test_service_returns_active_test_with_etag() {
        let now = Utc::now();
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![Model {
                    id: Uuid::new_v4(),
                    name: "tempest".to_owned(),
                    state: ResourceState::Active,
                    etag: "5f1c2d".to_owned(),
                    created_at: now,
                    updated_at: now,
                }]])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");

        let result = PostgresCiTestService.create(&transaction, "tempest").await;

        let test = result.expect("creating test should be successful");
        assert_eq!(test.name, "tempest");
        assert_eq!(test.state, ResourceState::Active);
    }

    #[tokio::test]
    async fn when_creating_test_with_control_characters_then_test_service_returns_invalid_name_err() {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");

        let result = PostgresCiTestService.create(&transaction, "tem\tpest").await;

        assert!(matches!(result, Err(Error::InvalidName)));
    }
}
