use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostRoleRequest {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// `label` is not updatable; sending it fails deserialization.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PutRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostRolePermissionRequest {
    pub permission_id: Uuid,
}
