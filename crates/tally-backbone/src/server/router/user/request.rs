use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostUserRequest {
    pub name: String,
    pub password: String,
    pub role_id: Uuid,
    pub team_id: Uuid,
}
