use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{application::permission::PermissionData, database::ResourceState, server::response::Meta};

#[derive(Serialize, Debug)]
pub(crate) struct PermissionResponse {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PermissionData> for PermissionResponse {
    fn from(value: PermissionData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            label: value.label,
            description: value.description,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetPermissionResponse {
    pub permission: PermissionResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct GetPermissionsResponse {
    pub permissions: Vec<PermissionResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}
