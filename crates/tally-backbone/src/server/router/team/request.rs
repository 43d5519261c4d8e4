use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostTeamRequest {
    pub name: String,
    pub parent_id: Option<Uuid>,
}
