use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait, LoaderTrait, PaginatorTrait,
    QueryFilter, Set,
};
use tally_common::{gen_etag, normalize_etag, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{
    ci_test, component, constraint_violation, jobdefinition, jobdefinition_component, ConstraintViolation,
    Persistable,
};

use super::{
    ci_test::CiTest,
    component::Component,
    query::{ListQuery, Page, QueryError},
};

pub(crate) const EMBEDS: &[&str] = &["test", "components"];

/// Relations to inline when loading jobdefinitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Embeds {
    pub test: bool,
    pub components: bool,
}

impl Embeds {
    pub fn of(query: &ListQuery) -> Result<Self> {
        query.ensure_embeds(EMBEDS)?;
        Ok(Self { test: query.embeds("test"), components: query.embeds("components") })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Jobdefinition {
    pub id: Uuid,
    pub name: String,
    pub test_id: Uuid,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub test: Option<CiTest>,
    pub components: Option<Vec<Component>>,
    lookup_key: String,
    expected_etag: String,
    deleted: bool,
    updated_name: Option<String>,
    updated_test_id: Option<Uuid>,
}

impl Jobdefinition {
    pub fn guard(&mut self, if_match: &str) {
        self.expected_etag = normalize_etag(if_match).to_owned();
    }

    pub fn delete(&mut self) {
        self.deleted = true
    }

    pub fn update_name(&mut self, new_name: String) -> Result<()> {
        if !validate_name(&new_name) {
            return Err(Error::InvalidName);
        }
        if self.name != new_name {
            self.updated_name = Some(new_name);
        }
        Ok(())
    }

    pub fn update_test(&mut self, new_test_id: Uuid) {
        if self.test_id != new_test_id {
            self.updated_test_id = Some(new_test_id);
        }
    }
}

/// Matches a jobdefinition addressed either by id or by name.
fn id_or_name(key: &str) -> Condition {
    let condition = Condition::any().add(jobdefinition::Column::Name.eq(key));
    match Uuid::parse_str(key) {
        Ok(id) => condition.add(jobdefinition::Column::Id.eq(id)),
        Err(_) => condition,
    }
}

#[async_trait]
impl Persistable for Jobdefinition {
    type Error = Error;

    async fn persist(self, transaction: &DatabaseTransaction) -> Result<String> {
        use jobdefinition::{ActiveModel, Column, Entity};

        if self.deleted {
            let result = Entity::delete_many()
                .filter(id_or_name(&self.lookup_key))
                .filter(Column::Etag.eq(self.expected_etag.as_str()))
                .exec(transaction)
                .await?;
            if result.rows_affected == 0 {
                return Err(Error::Conflict);
            }

            info!("jobdefinition(id: {}, name: {}) deleted.", self.id, self.name);
            return Ok(self.expected_etag);
        }

        let etag = gen_etag();
        let changes = ActiveModel {
            name: self.updated_name.map(Set).unwrap_or_default(),
            test_id: self.updated_test_id.map(Set).unwrap_or_default(),
            etag: Set(etag.clone()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        let result = Entity::update_many()
            .set(changes)
            .filter(Column::Id.eq(self.id))
            .filter(Column::Etag.eq(self.expected_etag.as_str()))
            .exec(transaction)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::Conflict);
        }

        Ok(etag)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait JobdefinitionService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<Jobdefinition>>;
    async fn get(&self, transaction: &DatabaseTransaction, key: &str, embeds: Embeds) -> Result<Option<Jobdefinition>>;
    async fn create(&self, transaction: &DatabaseTransaction, name: &str, test_id: &Uuid) -> Result<Jobdefinition>;
    async fn get_components(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Vec<Component>>;
    async fn attach_component(
        &self,
        transaction: &DatabaseTransaction,
        id: &Uuid,
        component_id: &Uuid,
    ) -> Result<()>;
    /// Returns whether a link was removed.
    async fn detach_component(
        &self,
        transaction: &DatabaseTransaction,
        id: &Uuid,
        component_id: &Uuid,
    ) -> Result<bool>;
}

pub(crate) struct PostgresJobdefinitionService;

impl PostgresJobdefinitionService {
    async fn load(
        &self,
        transaction: &DatabaseTransaction,
        models: Vec<jobdefinition::Model>,
        embeds: Embeds,
    ) -> Result<Vec<Jobdefinition>> {
        let tests: Vec<Option<CiTest>> = if embeds.test {
            models.load_one(ci_test::Entity, transaction).await?.into_iter().map(|t| t.map(CiTest::from)).collect()
        } else {
            vec![None; models.len()]
        };
        let components: Vec<Option<Vec<Component>>> = if embeds.components {
            models
                .load_many_to_many(component::Entity, jobdefinition_component::Entity, transaction)
                .await?
                .into_iter()
                .map(|components| Some(components.into_iter().map(Component::from).collect()))
                .collect()
        } else {
            vec![None; models.len()]
        };

        Ok(models
            .into_iter()
            .zip(tests)
            .zip(components)
            .map(|((model, test), components)| Jobdefinition { test, components, ..Jobdefinition::from(model) })
            .collect())
    }
}

#[async_trait]
impl JobdefinitionService for PostgresJobdefinitionService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<Jobdefinition>> {
        let embeds = Embeds::of(query)?;
        let select = query.apply(jobdefinition::Entity::find(), &[])?;

        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        Ok(Page { items: self.load(transaction, models, embeds).await?, count })
    }

    async fn get(&self, transaction: &DatabaseTransaction, key: &str, embeds: Embeds) -> Result<Option<Jobdefinition>> {
        let Some(model) = jobdefinition::Entity::find().filter(id_or_name(key)).one(transaction).await? else {
            return Ok(None);
        };

        let jobdefinition = self.load(transaction, vec![model], embeds).await?.pop();

        Ok(jobdefinition.map(|jobdefinition| Jobdefinition { lookup_key: key.to_owned(), ..jobdefinition }))
    }

    async fn create(&self, transaction: &DatabaseTransaction, name: &str, test_id: &Uuid) -> Result<Jobdefinition> {
        if !validate_name(name) {
            return Err(Error::InvalidName);
        }

        let now = Utc::now();
        let model = jobdefinition::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_owned()),
            test_id: Set(*test_id),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("jobdefinition(id: {}, name: {name}) created.", model.id);

        Ok(model.into())
    }

    async fn get_components(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Vec<Component>> {
        use jobdefinition_component::Column;

        let models = component::Entity::find()
            .inner_join(jobdefinition_component::Entity)
            .filter(Column::JobdefinitionId.eq(*id))
            .all(transaction)
            .await?;

        Ok(models.into_iter().map(Component::from).collect())
    }

    async fn attach_component(
        &self,
        transaction: &DatabaseTransaction,
        id: &Uuid,
        component_id: &Uuid,
    ) -> Result<()> {
        let link = jobdefinition_component::ActiveModel { jobdefinition_id: Set(*id), component_id: Set(*component_id) };

        jobdefinition_component::Entity::insert(link).exec_without_returning(transaction).await.map_err(|e| {
            match constraint_violation(&e) {
                Some(ConstraintViolation::Unique) => Error::AlreadyLinked,
                _ => e.into(),
            }
        })?;

        info!("component(id: {component_id}) attached to jobdefinition(id: {id}).");
        Ok(())
    }

    async fn detach_component(
        &self,
        transaction: &DatabaseTransaction,
        id: &Uuid,
        component_id: &Uuid,
    ) -> Result<bool> {
        use jobdefinition_component::{Column, Entity};

        let result = Entity::delete_many()
            .filter(Column::JobdefinitionId.eq(*id))
            .filter(Column::ComponentId.eq(*component_id))
            .exec(transaction)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

impl From<jobdefinition::Model> for Jobdefinition {
    fn from(value: jobdefinition::Model) -> Self {
        Self {
            lookup_key: value.id.to_string(),
            id: value.id,
            name: value.name,
            test_id: value.test_id,
            expected_etag: value.etag.clone(),
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            test: None,
            components: None,
            deleted: false,
            updated_name: None,
            updated_test_id: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid jobdefinition name")]
    InvalidName,
    #[error("jobdefinition was modified concurrently")]
    Conflict,
    #[error("jobdefinition name already exists")]
    NameConflicted,
    #[error("component is already attached to jobdefinition")]
    AlreadyLinked,
    #[error("referenced test or component does not exist")]
    IntegrityViolation,
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),
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

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, EntityTrait, MockDatabase, MockExecResult, QueryFilter, QueryTrait, TransactionTrait};
    use uuid::Uuid;

    use super::{id_or_name, Embeds, Error, Jobdefinition, JobdefinitionService, PostgresJobdefinitionService};
    use crate::{
        database::{jobdefinition, Persistable},
        domain::query::{ListQuery, QueryError},
    };

    pub(crate) fn jobdefinition_model(name: &str) -> jobdefinition::Model {
        let now = Utc::now();
        jobdefinition::Model {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            test_id: Uuid::new_v4(),
            etag: "c0ffee".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    fn lookup_where(key: &str) -> String {
        let sql = jobdefinition::Entity::find().filter(id_or_name(key)).build(DatabaseBackend::Postgres).to_string();
        sql.split_once(" WHERE ").map(|(_, condition)| condition.to_owned()).unwrap_or_default()
    }

    #[test]
    fn when_key_is_uuid_then_lookup_matches_id_or_name() {
        let id = Uuid::new_v4().to_string();
        let condition = lookup_where(&id);

        assert!(condition.contains(&format!(r#""jobdefinitions"."name" = '{id}'"#)), "{condition}");
        assert!(condition.contains(&format!(r#" OR "jobdefinitions"."id" = '{id}'"#)), "{condition}");
    }

    #[test]
    fn when_key_is_plain_name_then_lookup_matches_name_only() {
        let condition = lookup_where("nightly-build");

        assert_eq!(condition, r#""jobdefinitions"."name" = 'nightly-build'"#);
    }

    #[test]
    fn when_unknown_relation_is_requested_then_embeds_returns_invalid_query_err() {
        let query = ListQuery::parse(None, None, None, None, Some("test,owner")).unwrap();

        assert!(matches!(
            Embeds::of(&query),
            Err(Error::InvalidQuery(QueryError::UnknownEmbed(embed))) if embed == "owner"
        ));
    }

    #[tokio::test]
    async fn when_delete_matches_etag_then_jobdefinition_is_hard_deleted() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");
        let mut jobdefinition = Jobdefinition::from(jobdefinition_model("nightly"));
        jobdefinition.guard("\"c0ffee\"");
        jobdefinition.delete();

        let result = jobdefinition.persist(&transaction).await;

        assert_eq!(result.expect("deleting jobdefinition should be successful"), "c0ffee");
    }

    #[tokio::test]
    async fn when_delete_does_not_match_etag_then_persist_returns_conflict_err() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");
        let mut jobdefinition = Jobdefinition::from(jobdefinition_model("nightly"));
        jobdefinition.guard("deadbeef");
        jobdefinition.delete();

        assert!(matches!(jobdefinition.persist(&transaction).await, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn when_getting_by_name_then_jobdefinition_service_remembers_lookup_key() {
        let model = jobdefinition_model("nightly");
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![model.clone()]]).into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");

        let result = PostgresJobdefinitionService.get(&transaction, "nightly", Embeds::default()).await;

        let jobdefinition =
            result.expect("getting jobdefinition should be successful").expect("jobdefinition should exist");
        assert_eq!(jobdefinition.id, model.id);
        assert_eq!(jobdefinition.lookup_key, "nightly");
    }
}
