use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{application::component::ComponentData, database::ResourceState, server::response::Meta};

#[derive(Serialize, Debug)]
pub(crate) struct ComponentResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ComponentData> for ComponentResponse {
    fn from(value: ComponentData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            component_type: value.component_type,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetComponentResponse {
    pub component: ComponentResponse,
}

#[derive(Serialize, Debug)]
pub(crate) struct GetComponentsResponse {
    pub components: Vec<ComponentResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}
