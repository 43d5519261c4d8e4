use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    application::jobdefinition::JobdefinitionData,
    server::{
        response::Meta,
        router::{ci_test::response::TestResponse, component::response::ComponentResponse},
    },
};

#[derive(Serialize, Debug)]
pub(super) struct JobdefinitionResponse {
    pub id: Uuid,
    pub name: String,
    pub test_id: Uuid,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentResponse>>,
}

impl From<JobdefinitionData> for JobdefinitionResponse {
    fn from(value: JobdefinitionData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            test_id: value.test_id,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            test: value.test.map(TestResponse::from),
            components: value
                .components
                .map(|components| components.into_iter().map(ComponentResponse::from).collect()),
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetJobdefinitionResponse {
    pub jobdefinition: JobdefinitionResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct GetJobdefinitionsResponse {
    pub jobdefinitions: Vec<JobdefinitionResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}
