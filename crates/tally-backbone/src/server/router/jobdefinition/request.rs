use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostJobdefinitionRequest {
    pub name: String,
    pub test_id: Uuid,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PutJobdefinitionRequest {
    pub name: Option<String>,
    pub test_id: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostJobdefinitionComponentRequest {
    pub component_id: Uuid,
}
