use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::ResourceState;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostFeederRequest {
    pub name: String,
    pub team_id: Uuid,
    pub data: Option<Value>,
    pub state: Option<ResourceState>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PutFeederRequest {
    pub name: Option<String>,
    pub team_id: Option<Uuid>,
    pub data: Option<Value>,
    pub state: Option<ResourceState>,
}
