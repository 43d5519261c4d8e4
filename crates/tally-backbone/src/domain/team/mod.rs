use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tally_common::{gen_etag, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{constraint_violation, team, ConstraintViolation, ResourceState};

use super::query::{ListQuery, Page, QueryError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Team {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) struct NewTeam {
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait TeamService {
    /// Lists non-archived teams; `teams` restricts the listing to those ids.
    async fn get_all(
        &self,
        transaction: &DatabaseTransaction,
        query: &ListQuery,
        teams: Option<Vec<Uuid>>,
    ) -> Result<Page<Team>>;
    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<Team>>;
    async fn get_by_name(&self, transaction: &DatabaseTransaction, name: &str) -> Result<Option<Team>>;
    async fn create(&self, transaction: &DatabaseTransaction, new_team: NewTeam) -> Result<Team>;
}

pub(crate) struct PostgresTeamService;

#[async_trait]
impl TeamService for PostgresTeamService {
    async fn get_all(
        &self,
        transaction: &DatabaseTransaction,
        query: &ListQuery,
        teams: Option<Vec<Uuid>>,
    ) -> Result<Page<Team>> {
        use team::{Column, Entity};

        let mut select = query.apply(Entity::find(), &[])?.filter(Column::State.ne(ResourceState::Archived));
        if let Some(teams) = teams {
            select = select.filter(Column::Id.is_in(teams));
        }

        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        Ok(Page { items: models.into_iter().map(Team::from).collect(), count })
    }

    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<Team>> {
        let model = team::Entity::find_by_id(*id).one(transaction).await?;

        Ok(model.map(Team::from))
    }

    async fn get_by_name(&self, transaction: &DatabaseTransaction, name: &str) -> Result<Option<Team>> {
        use team::{Column, Entity};

        let model = Entity::find().filter(Column::Name.eq(name)).one(transaction).await?;

        Ok(model.map(Team::from))
    }

    async fn create(&self, transaction: &DatabaseTransaction, new_team: NewTeam) -> Result<Team> {
        if !validate_name(&new_team.name) {
            return Err(Error::InvalidName);
        }

        let now = Utc::now();
        let model = team::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_team.name),
            parent_id: Set(new_team.parent_id),
            state: Set(ResourceState::Active),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("team(id: {}, name: {}) created.", model.id, model.name);

        Ok(model.into())
    }
}

impl From<team::Model> for Team {
    fn from(value: team::Model) -> Self {
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
    #[error("invalid team name")]
    InvalidName,
    #[error("team name already exists")]
    NameConflicted,
    #[error("referenced parent team does not exist")]
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
