use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{application::ci_test::CiTestData, database::ResourceState, server::response::Meta};

#[derive(Serialize, Debug)]
pub(crate) struct TestResponse {
    pub id: Uuid,
    pub name: String,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CiTestData> for TestResponse {
    fn from(value: CiTestData) -> Self {
        Self {
            id: value.id,
            name: value.name,
            state: value.state,
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub(super) struct GetTestResponse {
    pub test: TestResponse,
}

#[derive(Serialize, Debug)]
pub(super) struct GetTestsResponse {
    pub tests: Vec<TestResponse>,
    #[serde(rename = "_meta")]
    pub meta: Meta,
}
