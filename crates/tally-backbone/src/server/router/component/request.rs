use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(crate) struct PostComponentRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
}
