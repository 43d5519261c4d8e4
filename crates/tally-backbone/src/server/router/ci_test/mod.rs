use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    application::{
        ci_test::{self, CiTestUseCase},
        Application,
    },
    server::{
        check_role,
        request::{Listing, ValidJson},
        response::{error_response, etag_header, handle_internal_server_error, Meta},
        CATALOG_WRITERS,
    },
};

use self::{
    request::PostTestRequest,
    response::{GetTestResponse, GetTestsResponse, TestResponse},
};

mod request;
pub(crate) mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let writer_router = Router::new()
        .route("/tests", post(handle_post_test))
        .route_layer(middleware::from_fn_with_state(CATALOG_WRITERS, check_role));
    let member_router =
        Router::new().route("/tests", get(handle_get_tests)).route("/tests/:test_id", get(handle_get_test));

    Router::new().merge(member_router).merge(writer_router).with_state(application)
}

#[debug_handler]
async fn handle_post_test(
    State(application): State<Arc<Application>>,
    ValidJson(payload): ValidJson<PostTestRequest>,
) -> Result<impl IntoResponse, ci_test::Error> {
    let test = application.ci_test().create(&payload.name).await?;

    Ok((StatusCode::CREATED, etag_header(test.etag.clone()), Json(GetTestResponse { test: test.into() })))
}

#[debug_handler]
async fn handle_get_tests(
    State(application): State<Arc<Application>>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, ci_test::Error> {
    let page = application.ci_test().get_all(query).await?;

    Ok(Json(GetTestsResponse {
        tests: page.items.into_iter().map(TestResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_test(
    Path(test_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
) -> Result<impl IntoResponse, ci_test::Error> {
    let test = application.ci_test().get(&test_id).await?;

    Ok((etag_header(test.etag.clone()), Json(GetTestResponse { test: test.into() })))
}

impl IntoResponse for ci_test::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            ci_test::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            ci_test::Error::TestNotExists => error_response(StatusCode::NOT_FOUND, "TEST_NOT_EXISTS", "test is not exists."),
            ci_test::Error::TestNameConflicted => {
                error_response(StatusCode::CONFLICT, "TEST_NAME_CONFLICTED", "test is already exists.")
            }
            ci_test::Error::InvalidPayload(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message)
            }
            ci_test::Error::InvalidQuery(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message)
            }
        }
    }
}
