use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde_json::Value;
use tally_auth::Principal;
use uuid::Uuid;

use crate::{
    database::{Persistable, ResourceState},
    domain::{
        self,
        feeder::{Feeder, FeederService, NewFeeder, EMBEDS},
        query::{ListQuery, Page},
    },
};

use super::team::TeamData;

#[async_trait]
pub(crate) trait FeederUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<FeederData>>;
    async fn get(&self, id: &Uuid, query: ListQuery) -> Result<FeederData>;
    async fn create(&self, cmd: CreatingFeederCommand) -> Result<FeederData>;
    async fn update(&self, id: &Uuid, if_match: &str, cmd: UpdatingFeederCommand) -> Result<String>;
    async fn delete(&self, id: &Uuid, if_match: &str) -> Result<()>;
    async fn refresh_api_secret(&self, id: &Uuid, if_match: &str) -> Result<FeederSecretData>;
    async fn get_archived(&self) -> Result<Vec<FeederData>>;
    async fn purge(&self) -> Result<()>;
}

pub(crate) struct FeederUseCaseImpl {
    principal: Principal,
    database_connection: Arc<DatabaseConnection>,
    feeder_service: Arc<dyn FeederService + Sync + Send>,
}

impl FeederUseCaseImpl {
    pub fn new(
        principal: Principal,
        database_connection: Arc<DatabaseConnection>,
        feeder_service: Arc<dyn FeederService + Sync + Send>,
    ) -> Self {
        Self { principal, database_connection, feeder_service }
    }

    fn teams_filter(&self) -> Option<Vec<Uuid>> {
        if self.principal.is_super_admin() {
            None
        } else {
            Some(self.principal.teams.clone())
        }
    }

    fn ensure_in_team(&self, team_id: &Uuid) -> Result<()> {
        if self.principal.is_in_team(team_id) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Loads a feeder for a conditional write; archived feeders are returned so the write reports a conflict.
    async fn get_for_write(&self, transaction: &DatabaseTransaction, id: &Uuid, if_match: &str) -> Result<Feeder> {
        let mut feeder = self.feeder_service.get(transaction, id, false).await?.ok_or(Error::FeederNotExists)?;
        self.ensure_in_team(&feeder.team_id)?;
        feeder.guard(if_match);

        Ok(feeder)
    }
}

#[async_trait]
impl FeederUseCase for FeederUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<FeederData>> {
        let transaction = self.database_connection.begin().await?;

        let page = self.feeder_service.get_all(&transaction, &query, self.teams_filter()).await?;

        transaction.commit().await?;

        Ok(page.map(FeederData::from))
    }

    async fn get(&self, id: &Uuid, query: ListQuery) -> Result<FeederData> {
        query.ensure_embeds(EMBEDS).map_err(|e| Error::InvalidQuery(e.to_string()))?;
        let transaction = self.database_connection.begin().await?;

        let feeder = self
            .feeder_service
            .get(&transaction, id, query.embeds("team"))
            .await?
            .filter(|feeder| !feeder.is_archived())
            .ok_or(Error::FeederNotExists)?;
        self.ensure_in_team(&feeder.team_id)?;

        transaction.commit().await?;

        Ok(feeder.into())
    }

    async fn create(&self, cmd: CreatingFeederCommand) -> Result<FeederData> {
        self.ensure_in_team(&cmd.team_id)?;
        let transaction = self.database_connection.begin().await?;

        let feeder = self
            .feeder_service
            .create(
                &transaction,
                NewFeeder { name: cmd.name, team_id: cmd.team_id, data: cmd.data, state: cmd.state },
            )
            .await?;

        transaction.commit().await?;

        Ok(feeder.into())
    }

    async fn update(&self, id: &Uuid, if_match: &str, cmd: UpdatingFeederCommand) -> Result<String> {
        let transaction = self.database_connection.begin().await?;

        let mut feeder = self.get_for_write(&transaction, id, if_match).await?;
        if let Some(name) = cmd.name {
            feeder.update_name(name)?;
        }
        if let Some(team_id) = cmd.team_id {
            self.ensure_in_team(&team_id)?;
            feeder.update_team(team_id);
        }
        if let Some(data) = cmd.data {
            feeder.update_data(data);
        }
        if let Some(state) = cmd.state {
            feeder.update_state(state)?;
        }
        let etag = feeder.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(etag)
    }

    async fn delete(&self, id: &Uuid, if_match: &str) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        let mut feeder = self.get_for_write(&transaction, id, if_match).await?;
        feeder.archive();
        feeder.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(())
    }

    async fn refresh_api_secret(&self, id: &Uuid, if_match: &str) -> Result<FeederSecretData> {
        let transaction = self.database_connection.begin().await?;

        let mut feeder = self.get_for_write(&transaction, id, if_match).await?;
        let id = feeder.id;
        let api_secret = feeder.refresh_api_secret();
        let etag = feeder.persist(&transaction).await?;

        transaction.commit().await?;

        Ok(FeederSecretData { id, etag, api_secret })
    }

    async fn get_archived(&self) -> Result<Vec<FeederData>> {
        let transaction = self.database_connection.begin().await?;

        let feeders = self.feeder_service.get_archived(&transaction).await?;

        transaction.commit().await?;

        Ok(feeders.into_iter().map(FeederData::from).collect())
    }

    async fn purge(&self) -> Result<()> {
        let transaction = self.database_connection.begin().await?;

        self.feeder_service.purge(&transaction).await?;

        transaction.commit().await?;

        Ok(())
    }
}

pub(crate) struct CreatingFeederCommand {
    pub name: String,
    pub team_id: Uuid,
    pub data: Option<Value>,
    pub state: Option<ResourceState>,
}

#[derive(Default)]
pub(crate) struct UpdatingFeederCommand {
    pub name: Option<String>,
    pub team_id: Option<Uuid>,
    pub data: Option<Value>,
    pub state: Option<ResourceState>,
}

pub(crate) struct FeederData {
    pub id: Uuid,
    pub name: String,
    pub team_id: Uuid,
    pub api_secret: String,
    pub role_id: Uuid,
    pub data: Value,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub team: Option<TeamData>,
}

impl From<Feeder> for FeederData {
    fn from(value: Feeder) -> Self {
        Self {
            id: value.id,
            name: value.name,
            team_id: value.team_id,
            api_secret: value.api_secret,
            role_id: value.role_id,
            data: value.data,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            team: value.team.map(TeamData::from),
        }
    }
}

pub(crate) struct FeederSecretData {
    pub id: Uuid,
    pub etag: String,
    pub api_secret: String,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("feeder is not exists")]
    FeederNotExists,
    #[error("principal cannot act on this team")]
    Unauthorized,
    #[error("feeder was modified concurrently or is archived")]
    Conflict,
    #[error("feeder name already exists in team")]
    FeederNameConflicted,
    #[error("referenced team does not exist")]
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

impl From<domain::feeder::Error> for Error {
    fn from(value: domain::feeder::Error) -> Self {
        use domain::feeder::Error as E;

        match value {
            E::InvalidName | E::InvalidState => Error::InvalidPayload(value.to_string()),
            E::Conflict => Error::Conflict,
            E::NameConflicted => Error::FeederNameConflicted,
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

    use super::{CreatingFeederCommand, Error, FeederUseCase, FeederUseCaseImpl, UpdatingFeederCommand};
    use crate::{
        application::test::principal,
        database::ResourceState,
        domain::{
            feeder::{test::feeder_model, Feeder, MockFeederService},
            query::{ListQuery, Page},
        },
    };

    fn use_case(principal: Principal, feeder_service: MockFeederService) -> FeederUseCaseImpl {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        FeederUseCaseImpl::new(principal, mock_connection, Arc::new(feeder_service))
    }

    #[tokio::test]
    async fn when_product_owner_lists_feeders_then_listing_is_restricted_to_own_teams() {
        let team_id = Uuid::new_v4();
        let mut feeder_service = MockFeederService::new();
        feeder_service
            .expect_get_all()
            .withf(move |_, _, teams| teams.as_deref() == Some(&[team_id][..]))
            .times(1)
            .returning(move |_, _, _| Ok(Page { items: vec![Feeder::from(feeder_model(team_id))], count: 1 }));

        let result = use_case(principal(RoleLabel::ProductOwner, team_id), feeder_service)
            .get_all(ListQuery::default())
            .await;

        let page = result.expect("listing feeders should be successful");
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].team_id, team_id);
    }

    #[tokio::test]
    async fn when_super_admin_lists_feeders_then_listing_is_not_restricted() {
        let mut feeder_service = MockFeederService::new();
        feeder_service
            .expect_get_all()
            .withf(|_, _, teams| teams.is_none())
            .times(1)
            .returning(|_, _, _| Ok(Page { items: vec![], count: 0 }));

        let result = use_case(principal(RoleLabel::SuperAdmin, Uuid::new_v4()), feeder_service)
            .get_all(ListQuery::default())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn when_feeder_is_archived_then_getting_it_returns_feeder_not_exists_err() {
        let team_id = Uuid::new_v4();
        let mut feeder_service = MockFeederService::new();
        feeder_service.expect_get().times(1).returning(move |_, _, _| {
            Ok(Some(Feeder::from(crate::database::feeder::Model {
                state: ResourceState::Archived,
                ..feeder_model(team_id)
            })))
        });

        let result = use_case(principal(RoleLabel::ProductOwner, team_id), feeder_service)
            .get(&Uuid::new_v4(), ListQuery::default())
            .await;

        assert!(matches!(result, Err(Error::FeederNotExists)));
    }

    #[tokio::test]
    async fn when_feeder_belongs_to_foreign_team_then_getting_it_returns_unauthorized_err() {
        let mut feeder_service = MockFeederService::new();
        feeder_service
            .expect_get()
            .times(1)
            .returning(|_, _, _| Ok(Some(Feeder::from(feeder_model(Uuid::new_v4())))));

        let result = use_case(principal(RoleLabel::ProductOwner, Uuid::new_v4()), feeder_service)
            .get(&Uuid::new_v4(), ListQuery::default())
            .await;

        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn when_creating_feeder_in_foreign_team_then_use_case_returns_unauthorized_without_touching_service() {
        let mut feeder_service = MockFeederService::new();
        feeder_service.expect_create().never();

        let result = use_case(principal(RoleLabel::ProductOwner, Uuid::new_v4()), feeder_service)
            .create(CreatingFeederCommand {
                name: "nightly".to_owned(),
                team_id: Uuid::new_v4(),
                data: None,
                state: None,
            })
            .await;

        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn when_updating_missing_feeder_then_use_case_returns_feeder_not_exists_err() {
        let mut feeder_service = MockFeederService::new();
        feeder_service.expect_get().times(1).returning(|_, _, _| Ok(None));

        let result = use_case(principal(RoleLabel::SuperAdmin, Uuid::new_v4()), feeder_service)
            .update(&Uuid::new_v4(), "etag", UpdatingFeederCommand::default())
            .await;

        assert!(matches!(result, Err(Error::FeederNotExists)));
    }

    #[tokio::test]
    async fn when_moving_feeder_to_foreign_team_then_use_case_returns_unauthorized_err() {
        let team_id = Uuid::new_v4();
        let mut feeder_service = MockFeederService::new();
        feeder_service.expect_get().times(1).returning(move |_, _, _| Ok(Some(Feeder::from(feeder_model(team_id)))));

        let result = use_case(principal(RoleLabel::ProductOwner, team_id), feeder_service)
            .update(
                &Uuid::new_v4(),
                "etag",
                UpdatingFeederCommand { team_id: Some(Uuid::new_v4()), ..Default::default() },
            )
            .await;

        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn when_updating_state_to_archived_then_use_case_returns_invalid_payload_err() {
        let team_id = Uuid::new_v4();
        let mut feeder_service = MockFeederService::new();
        feeder_service.expect_get().times(1).returning(move |_, _, _| Ok(Some(Feeder::from(feeder_model(team_id)))));

        let result = use_case(principal(RoleLabel::ProductOwner, team_id), feeder_service)
            .update(
                &Uuid::new_v4(),
                "etag",
                UpdatingFeederCommand { state: Some(ResourceState::Archived), ..Default::default() },
            )
            .await;

        assert!(matches!(result, Err(Error::InvalidPayload(_))));
    }
}
