use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_auth::RoleLabel;
use uuid::Uuid;

use crate::{
    application::user::{IdentityData, UserData},
    database::ResourceState,
};

#[derive(Serialize, Debug)]
pub(super) struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub team_id: Uuid,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserData> for UserResponse {
    fn from(value: UserData) -> Self {
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

#[derive(Serialize, Debug)]
pub(super) struct GetUserResponse {
    pub user: UserResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct IdentityResponse {
    pub id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub role_label: RoleLabel,
    pub team_id: Uuid,
    pub teams: Vec<Uuid>,
}

impl From<IdentityData> for IdentityResponse {
    fn from(value: IdentityData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            role_id: value.role_id,
            role_label: value.role_label,
            team_id: value.team_id,
            teams: value.teams,
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetIdentityResponse {
    pub identity: IdentityResponse,
}
