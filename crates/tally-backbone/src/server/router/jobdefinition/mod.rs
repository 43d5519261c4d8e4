use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    application::{
        jobdefinition::{self, CreatingJobdefinitionCommand, JobdefinitionUseCase, UpdatingJobdefinitionCommand},
        Application,
    },
    server::{
        check_role,
        request::{IfMatch, Listing, ValidJson},
        response::{error_response, etag_header, handle_internal_server_error, Meta},
        router::component::response::{ComponentResponse, GetComponentsResponse},
        CATALOG_WRITERS,
    },
};

use self::{
    request::{PostJobdefinitionComponentRequest, PostJobdefinitionRequest, PutJobdefinitionRequest},
    response::{GetJobdefinitionResponse, GetJobdefinitionsResponse, JobdefinitionResponse},
};

mod request;
mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let writer_router = Router::new()
        .route("/jobdefinitions", post(handle_post_jobdefinition))
        .route("/jobdefinitions/:jobdefinition_key", put(handle_put_jobdefinition).delete(handle_delete_jobdefinition))
        .route("/jobdefinitions/:jobdefinition_key/components", post(handle_post_jobdefinition_component))
        .route(
            "/jobdefinitions/:jobdefinition_key/components/:component_id",
            delete(handle_delete_jobdefinition_component),
        )
        .route_layer(middleware::from_fn_with_state(CATALOG_WRITERS, check_role));
    let member_router = Router::new()
        .route("/jobdefinitions", get(handle_get_jobdefinitions))
        .route("/jobdefinitions/:jobdefinition_key", get(handle_get_jobdefinition))
        .route("/jobdefinitions/:jobdefinition_key/components", get(handle_get_jobdefinition_components));

    Router::new().merge(member_router).merge(writer_router).with_state(application)
}

#[debug_handler]
async fn handle_post_jobdefinition(
    State(application): State<Arc<Application>>,
    ValidJson(payload): ValidJson<PostJobdefinitionRequest>,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    let jobdefinition = application.jobdefinition().create(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        etag_header(jobdefinition.etag.clone()),
        Json(GetJobdefinitionResponse { jobdefinition: jobdefinition.into() }),
    ))
}

impl From<PostJobdefinitionRequest> for CreatingJobdefinitionCommand {
    fn from(value: PostJobdefinitionRequest) -> Self {
        Self { name: value.name, test_id: value.test_id }
    }
}

#[debug_handler]
async fn handle_get_jobdefinitions(
    State(application): State<Arc<Application>>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    let page = application.jobdefinition().get_all(query).await?;

    Ok(Json(GetJobdefinitionsResponse {
        jobdefinitions: page.items.into_iter().map(JobdefinitionResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_jobdefinition(
    Path(jobdefinition_key): Path<String>,
    State(application): State<Arc<Application>>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    let jobdefinition = application.jobdefinition().get(&jobdefinition_key, query).await?;

    Ok((
        etag_header(jobdefinition.etag.clone()),
        Json(GetJobdefinitionResponse { jobdefinition: jobdefinition.into() }),
    ))
}

#[debug_handler]
async fn handle_put_jobdefinition(
    Path(jobdefinition_key): Path<String>,
    State(application): State<Arc<Application>>,
    IfMatch(if_match): IfMatch,
    ValidJson(payload): ValidJson<PutJobdefinitionRequest>,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    let etag = application.jobdefinition().update(&jobdefinition_key, &if_match, payload.into()).await?;

    Ok((StatusCode::NO_CONTENT, etag_header(etag)))
}

impl From<PutJobdefinitionRequest> for UpdatingJobdefinitionCommand {
    fn from(value: PutJobdefinitionRequest) -> Self {
        Self { name: value.name, test_id: value.test_id }
    }
}

#[debug_handler]
async fn handle_delete_jobdefinition(
    Path(jobdefinition_key): Path<String>,
    State(application): State<Arc<Application>>,
    IfMatch(if_match): IfMatch,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    application.jobdefinition().delete(&jobdefinition_key, &if_match).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn handle_get_jobdefinition_components(
    Path(jobdefinition_key): Path<String>,
    State(application): State<Arc<Application>>,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    let components = application.jobdefinition().get_components(&jobdefinition_key).await?;

    Ok(Json(GetComponentsResponse {
        meta: Meta { count: components.len() as u64 },
        components: components.into_iter().map(ComponentResponse::from).collect(),
    }))
}

#[debug_handler]
async fn handle_post_jobdefinition_component(
    Path(jobdefinition_key): Path<String>,
    State(application): State<Arc<Application>>,
    ValidJson(payload): ValidJson<PostJobdefinitionComponentRequest>,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    application.jobdefinition().attach_component(&jobdefinition_key, &payload.component_id).await?;

    Ok(StatusCode::CREATED)
}

#[debug_handler]
async fn handle_delete_jobdefinition_component(
    Path((jobdefinition_key, component_id)): Path<(String, Uuid)>,
    State(application): State<Arc<Application>>,
) -> Result<impl IntoResponse, jobdefinition::Error> {
    application.jobdefinition().detach_component(&jobdefinition_key, &component_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

impl IntoResponse for jobdefinition::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            jobdefinition::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            jobdefinition::Error::JobdefinitionNotExists => {
                error_response(StatusCode::NOT_FOUND, "JOBDEFINITION_NOT_EXISTS", "jobdefinition is not exists.")
            }
            jobdefinition::Error::Conflict => {
                error_response(StatusCode::CONFLICT, "CONFLICT", "jobdefinition was modified concurrently.")
            }
            jobdefinition::Error::JobdefinitionNameConflicted => error_response(
                StatusCode::CONFLICT,
                "JOBDEFINITION_NAME_CONFLICTED",
                "jobdefinition is already exists.",
            ),
            jobdefinition::Error::AlreadyLinked => error_response(
                StatusCode::CONFLICT,
                "COMPONENT_ALREADY_ATTACHED",
                "component is already attached to jobdefinition.",
            ),
            jobdefinition::Error::NotLinked => error_response(
                StatusCode::CONFLICT,
                "COMPONENT_NOT_ATTACHED",
                "component is not attached to jobdefinition.",
            ),
            jobdefinition::Error::IntegrityViolation => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INTEGRITY_VIOLATION",
                "referenced test or component does not exist.",
            ),
            jobdefinition::Error::InvalidPayload(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message)
            }
            jobdefinition::Error::InvalidQuery(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message)
            }
        }
    }
}
