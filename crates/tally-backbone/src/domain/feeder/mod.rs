use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, LoaderTrait, PaginatorTrait, QueryFilter,
    Select, Set,
};
use serde_json::Value;
use tally_auth::principal::FEEDER_LABEL;
use tally_common::{gen_api_secret, gen_etag, normalize_etag, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{constraint_violation, feeder, role, team, ConstraintViolation, Persistable, ResourceState};

use super::{
    purge_archived,
    query::{ListQuery, Page, QueryError},
    team::Team,
    update_if_match,
};

pub(crate) const EMBEDS: &[&str] = &["team"];
const HIDDEN_COLUMNS: &[&str] = &["api_secret"];

/// An agent that pushes job results on behalf of a team.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Feeder {
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
    pub team: Option<Team>,
    expected_etag: String,
    archived: bool,
    updated_name: Option<String>,
    updated_team_id: Option<Uuid>,
    updated_data: Option<Value>,
    updated_state: Option<ResourceState>,
    updated_api_secret: Option<String>,
}

impl Feeder {
    /// Makes the next write conditional on the version the client last saw.
    pub fn guard(&mut self, if_match: &str) {
        self.expected_etag = normalize_etag(if_match).to_owned();
    }

    pub fn is_archived(&self) -> bool {
        self.state == ResourceState::Archived
    }

    pub fn archive(&mut self) {
        self.archived = true
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

    pub fn update_team(&mut self, new_team_id: Uuid) {
        if self.team_id != new_team_id {
            self.updated_team_id = Some(new_team_id);
        }
    }

    pub fn update_data(&mut self, new_data: Value) {
        if self.data != new_data {
            self.updated_data = Some(new_data);
        }
    }

    pub fn update_state(&mut self, new_state: ResourceState) -> Result<()> {
        if new_state == ResourceState::Archived {
            return Err(Error::InvalidState);
        }
        if self.state != new_state {
            self.updated_state = Some(new_state);
        }
        Ok(())
    }

    /// Replaces the secret and returns the one that will be stored.
    pub fn refresh_api_secret(&mut self) -> String {
        let api_secret = gen_api_secret();
        self.updated_api_secret = Some(api_secret.clone());
        api_secret
    }
}

#[async_trait]
impl Persistable for Feeder {
    type Error = Error;

    async fn persist(self, transaction: &DatabaseTransaction) -> Result<String> {
        let now = Utc::now();

        if self.archived {
            let changes = feeder::ActiveModel {
                state: Set(ResourceState::Archived),
                updated_at: Set(now),
                ..Default::default()
            };
            if !update_if_match::<feeder::Entity>(transaction, changes, self.id, &self.expected_etag).await? {
                return Err(Error::Conflict);
            }

            info!("feeder(id: {}, name: {}) archived.", self.id, self.name);
            return Ok(self.expected_etag);
        }

        let etag = gen_etag();
        let changes = feeder::ActiveModel {
            name: self.updated_name.map(Set).unwrap_or_default(),
            team_id: self.updated_team_id.map(Set).unwrap_or_default(),
            data: self.updated_data.map(Set).unwrap_or_default(),
            state: self.updated_state.map(Set).unwrap_or_default(),
            api_secret: self.updated_api_secret.map(Set).unwrap_or_default(),
            etag: Set(etag.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        if !update_if_match::<feeder::Entity>(transaction, changes, self.id, &self.expected_etag).await? {
            return Err(Error::Conflict);
        }

        Ok(etag)
    }
}

pub(crate) struct NewFeeder {
    pub name: String,
    pub team_id: Uuid,
    pub data: Option<Value>,
    pub state: Option<ResourceState>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait FeederService {
    /// Lists non-archived feeders; `teams` restricts the listing to feeders of those teams.
    async fn get_all(
        &self,
        transaction: &DatabaseTransaction,
        query: &ListQuery,
        teams: Option<Vec<Uuid>>,
    ) -> Result<Page<Feeder>>;
    async fn get_archived(&self, transaction: &DatabaseTransaction) -> Result<Vec<Feeder>>;
    /// Finds a feeder whatever its state.
    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid, embed_team: bool) -> Result<Option<Feeder>>;
    async fn create(&self, transaction: &DatabaseTransaction, new_feeder: NewFeeder) -> Result<Feeder>;
    async fn purge(&self, transaction: &DatabaseTransaction) -> Result<u64>;
}

pub(crate) struct PostgresFeederService;

/// Live feeders matching `query`, narrowed to `teams` when given.
fn listing(query: &ListQuery, teams: Option<Vec<Uuid>>) -> Result<Select<feeder::Entity>> {
    use feeder::{Column, Entity};

    query.ensure_embeds(EMBEDS)?;
    let select = query.apply(Entity::find(), HIDDEN_COLUMNS)?.filter(Column::State.ne(ResourceState::Archived));

    Ok(match teams {
        Some(teams) => select.filter(Column::TeamId.is_in(teams)),
        None => select,
    })
}

impl PostgresFeederService {
    async fn with_teams(&self, transaction: &DatabaseTransaction, models: Vec<feeder::Model>) -> Result<Vec<Feeder>> {
        let teams = models.load_one(team::Entity, transaction).await?;

        Ok(models
            .into_iter()
            .zip(teams)
            .map(|(model, team)| Feeder { team: team.map(Team::from), ..Feeder::from(model) })
            .collect())
    }
}

#[async_trait]
impl FeederService for PostgresFeederService {
    async fn get_all(
        &self,
        transaction: &DatabaseTransaction,
        query: &ListQuery,
        teams: Option<Vec<Uuid>>,
    ) -> Result<Page<Feeder>> {
        let select = listing(query, teams)?;

        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        let items = if query.embeds("team") {
            self.with_teams(transaction, models).await?
        } else {
            models.into_iter().map(Feeder::from).collect()
        };

        Ok(Page { items, count })
    }

    async fn get_archived(&self, transaction: &DatabaseTransaction) -> Result<Vec<Feeder>> {
        use feeder::{Column, Entity};

        let models = Entity::find().filter(Column::State.eq(ResourceState::Archived)).all(transaction).await?;

        Ok(models.into_iter().map(Feeder::from).collect())
    }

    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid, embed_team: bool) -> Result<Option<Feeder>> {
        let Some(model) = feeder::Entity::find_by_id(*id).one(transaction).await? else {
            return Ok(None);
        };

        if embed_team {
            Ok(self.with_teams(transaction, vec![model]).await?.pop())
        } else {
            Ok(Some(model.into()))
        }
    }

    async fn create(&self, transaction: &DatabaseTransaction, new_feeder: NewFeeder) -> Result<Feeder> {
        if !validate_name(&new_feeder.name) {
            return Err(Error::InvalidName);
        }
        let state = new_feeder.state.unwrap_or(ResourceState::Active);
        if state == ResourceState::Archived {
            return Err(Error::InvalidState);
        }

        let feeder_role = role::Entity::find()
            .filter(role::Column::Label.eq(FEEDER_LABEL))
            .one(transaction)
            .await?
            .ok_or_else(|| anyhow::anyhow!("builtin role {FEEDER_LABEL} is missing"))?;

        let now = Utc::now();
        let model = feeder::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_feeder.name),
            team_id: Set(new_feeder.team_id),
            api_secret: Set(gen_api_secret()),
            role_id: Set(feeder_role.id),
            data: Set(new_feeder.data.unwrap_or_else(|| Value::Object(Default::default()))),
            state: Set(state),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("feeder(id: {}, name: {}) created in team {}.", model.id, model.name, model.team_id);

        Ok(model.into())
    }

    async fn purge(&self, transaction: &DatabaseTransaction) -> Result<u64> {
        let purged = purge_archived::<feeder::Entity>(transaction).await?;
        info!("{purged} archived feeders purged.");

        Ok(purged)
    }
}

impl From<feeder::Model> for Feeder {
    fn from(value: feeder::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            team_id: value.team_id,
            api_secret: value.api_secret,
            role_id: value.role_id,
            data: value.data,
            state: value.state,
            expected_etag: value.etag.clone(),
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            team: None,
            archived: false,
            updated_name: None,
            updated_team_id: None,
            updated_data: None,
            updated_state: None,
            updated_api_secret: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid feeder name")]
    InvalidName,
    #[error("feeder state can only be set to active or inactive")]
    InvalidState,
    #[error("feeder was modified concurrently or is archived")]
    Conflict,
    #[error("feeder name already exists in team")]
    NameConflicted,
    #[error("referenced team does not exist")]
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
