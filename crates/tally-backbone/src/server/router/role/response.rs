use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    application::role::RoleData,
    database::ResourceState,
    server::{response::Meta, router::permission::response::PermissionResponse},
};

#[derive(Serialize, Debug)]
pub(super) struct RoleResponse {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<PermissionResponse>>,
}

impl From<RoleData> for RoleResponse {
    fn from(value: RoleData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            label: value.label,
            description: value.description,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            permissions: value
                .permissions
                .map(|permissions| permissions.into_iter().map(PermissionResponse::from).collect()),
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetRoleResponse {
    pub role: RoleResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct GetRolesResponse {
    pub roles: Vec<RoleResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}
