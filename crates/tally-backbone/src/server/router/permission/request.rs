use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostPermissionRequest {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PutPermissionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
