use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{application::team::TeamData, database::ResourceState, server::response::Meta};

#[derive(Serialize, Debug)]
pub(crate) struct TeamResponse {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TeamData> for TeamResponse {
    fn from(value: TeamData) -> Self {
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

#[derive(Serialize, Debug)]
pub(super) struct GetTeamResponse {
    pub team: TeamResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct GetTeamsResponse {
    pub teams: Vec<TeamResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}
