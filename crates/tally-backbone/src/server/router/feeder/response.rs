use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    application::feeder::{FeederData, FeederSecretData},
    database::ResourceState,
    server::{response::Meta, router::team::response::TeamResponse},
};

#[derive(Serialize, Debug)]
pub(super) struct FeederResponse {
    pub id: Uuid,
    pub name: String,
    pub team_id: Uuid,
    pub role_id: Uuid,
    pub api_secret: String,
    pub data: Value,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamResponse>,
}

impl From<FeederData> for FeederResponse {
    fn from(value: FeederData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            team_id: value.team_id,
            role_id: value.role_id,
            api_secret: value.api_secret,
            data: value.data,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            team: value.team.map(TeamResponse::from),
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetFeederResponse {
    pub feeder: FeederResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct GetFeedersResponse {
    pub feeders: Vec<FeederResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}

#[derive(Serialize, Debug)]
pub(super) struct FeederSecretResponse {
    pub id: Uuid,
    pub etag: String,
    pub api_secret: String,
}

impl From<FeederSecretData> for FeederSecretResponse {
    fn from(value: FeederSecretData) -> Self {
        Self { id: value.id, etag: value.etag, api_secret: value.api_secret }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct RefreshedFeederSecretResponse {
    pub feeder: FeederSecretResponse,
}
