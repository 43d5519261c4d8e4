use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tally_auth::Principal;
use uuid::Uuid;

use crate::{
    database::ResourceState,
    domain::{
        self,
        query::{ListQuery, Page},
        team::{NewTeam, Team, TeamService},
    },
};

#[async_trait]
pub(crate) trait TeamUseCase {
    async fn get_all(&self, query: ListQuery) -> Result<Page<TeamData>>;
    async fn get(&self, id: &Uuid) -> Result<TeamData>;
    async fn create(&self, name: String, parent_id: Option<Uuid>) -> Result<TeamData>;
}

pub(crate) struct TeamUseCaseImpl {
    principal: Principal,
    database_connection: Arc<DatabaseConnection>,
    team_service: Arc<dyn TeamService + Sync + Send>,
}

impl TeamUseCaseImpl {
    pub fn new(
        principal: Principal,
        database_connection: Arc<DatabaseConnection>,
        team_service: Arc<dyn TeamService + Sync + Send>,
    ) -> Self {
        Self { principal, database_connection, team_service }
    }
}

#[async_trait]
impl TeamUseCase for TeamUseCaseImpl {
    async fn get_all(&self, query: ListQuery) -> Result<Page<TeamData>> {
        let teams = (!self.principal.is_super_admin()).then(|| self.principal.teams.clone());
        let transaction = self.database_connection.begin().await?;

        let page = self.team_service.get_all(&transaction, &query, teams).await?;

        transaction.commit().await?;

        Ok(page.map(TeamData::from))
    }

    async fn get(&self, id: &Uuid) -> Result<TeamData> {
        let transaction = self.database_connection.begin().await?;

        let team = self
            .team_service
            .get(&transaction, id)
            .await?
            .filter(|team| team.state != ResourceState::Archived)
            .ok_or(Error::TeamNotExists)?;
        if !self.principal.is_in_team(&team.id) {
            return Err(Error::Unauthorized);
        }

        transaction.commit().await?;

        Ok(team.into())
    }

    async fn create(&self, name: String, parent_id: Option<Uuid>) -> Result<TeamData> {
        let transaction = self.database_connection.begin().await?;

        let team = self.team_service.create(&transaction, NewTeam { name, parent_id }).await?;

        transaction.commit().await?;

        Ok(team.into())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TeamData {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Team> for TeamData {
    fn from(value: Team) -> Self {
        Self {
            id: value.id,
            name: value.name,
            parent_id: value.parent_id,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("team is not exists")]
    TeamNotExists,
    #[error("principal is not a member of this team")]
    Unauthorized,
    #[error("team name already exists")]
    TeamNameConflicted,
    #[error("referenced parent team does not exist")]
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

impl From<domain::team::Error> for Error {
    fn from(value: domain::team::Error) -> Self {
        use domain::team::Error as E;

        match value {
            E::InvalidName => Error::InvalidPayload(value.to_string()),
            E::NameConflicted => Error::TeamNameConflicted,
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

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tally_auth::RoleLabel;
    use uuid::Uuid;

    use super::{Error, TeamUseCase, TeamUseCaseImpl};
    use crate::{
        application::test::principal,
        database::ResourceState,
        domain::team::{MockTeamService, Team},
    };

    fn team(id: Uuid) -> Team {
        let now = Utc::now();
        Team {
            id,
            name: "ci".to_owned(),
            parent_id: None,
            state: ResourceState::Active,
            etag: "e1".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn when_principal_is_not_member_then_getting_team_returns_unauthorized_err() {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mut team_service = MockTeamService::new();
        team_service.expect_get().times(1).returning(|_, id| Ok(Some(team(*id))));

        let use_case = TeamUseCaseImpl::new(
            principal(RoleLabel::Admin, Uuid::new_v4()),
            mock_connection,
            Arc::new(team_service),
        );
        let result = use_case.get(&Uuid::new_v4()).await;

        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn when_principal_is_member_then_getting_team_returns_team() {
        let team_id = Uuid::new_v4();
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mut team_service = MockTeamService::new();
        team_service.expect_get().times(1).returning(|_, id| Ok(Some(team(*id))));

        let use_case =
            TeamUseCaseImpl::new(principal(RoleLabel::User, team_id), mock_connection, Arc::new(team_service));
        let result = use_case.get(&team_id).await;

        assert_eq!(result.expect("getting team should be successful").id, team_id);
    }
}
