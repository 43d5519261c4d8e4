use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use tally_auth::Principal;
use uuid::Uuid;

use crate::{
    application::{
        feeder::{self, CreatingFeederCommand, FeederUseCase, UpdatingFeederCommand},
        Application,
    },
    server::{
        check_role,
        request::{IfMatch, Listing, ValidJson},
        response::{error_response, etag_header, handle_internal_server_error, Meta},
        CATALOG_WRITERS, SUPER_ADMIN_ONLY,
    },
};

use self::{
    request::{PostFeederRequest, PutFeederRequest},
    response::{FeederResponse, GetFeederResponse, GetFeedersResponse, RefreshedFeederSecretResponse},
};

mod request;
mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let owner_router = Router::new()
        .route("/feeders", get(handle_get_feeders).post(handle_post_feeder))
        .route("/feeders/:feeder_id", get(handle_get_feeder).put(handle_put_feeder).delete(handle_delete_feeder))
        .route("/feeders/:feeder_id/api_secret", put(handle_put_feeder_api_secret))
        .route_layer(middleware::from_fn_with_state(CATALOG_WRITERS, check_role));
    let purge_router = Router::new()
        .route("/feeders/purge", get(handle_get_archived_feeders).post(handle_post_purge_feeders))
        .route_layer(middleware::from_fn_with_state(SUPER_ADMIN_ONLY, check_role));

    Router::new().merge(owner_router).merge(purge_router).with_state(application)
}

#[debug_handler]
async fn handle_post_feeder(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    ValidJson(payload): ValidJson<PostFeederRequest>,
) -> Result<impl IntoResponse, feeder::Error> {
    let feeder = application.as_principal(&principal).feeder().create(payload.into()).await?;

    Ok((StatusCode::CREATED, etag_header(feeder.etag.clone()), Json(GetFeederResponse { feeder: feeder.into() })))
}

impl From<PostFeederRequest> for CreatingFeederCommand {
    fn from(value: PostFeederRequest) -> Self {
        Self { name: value.name, team_id: value.team_id, data: value.data, state: value.state }
    }
}

#[debug_handler]
async fn handle_get_feeders(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, feeder::Error> {
    let page = application.as_principal(&principal).feeder().get_all(query).await?;

    Ok(Json(GetFeedersResponse {
        feeders: page.items.into_iter().map(FeederResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_feeder(
    Path(feeder_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, feeder::Error> {
    let feeder = application.as_principal(&principal).feeder().get(&feeder_id, query).await?;

    Ok((etag_header(feeder.etag.clone()), Json(GetFeederResponse { feeder: feeder.into() })))
}

#[debug_handler]
async fn handle_put_feeder(
    Path(feeder_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    IfMatch(if_match): IfMatch,
    ValidJson(payload): ValidJson<PutFeederRequest>,
) -> Result<impl IntoResponse, feeder::Error> {
    let etag = application.as_principal(&principal).feeder().update(&feeder_id, &if_match, payload.into()).await?;

    Ok((StatusCode::NO_CONTENT, etag_header(etag)))
}

impl From<PutFeederRequest> for UpdatingFeederCommand {
    fn from(value: PutFeederRequest) -> Self {
        Self { name: value.name, team_id: value.team_id, data: value.data, state: value.state }
    }
}

#[debug_handler]
async fn handle_delete_feeder(
    Path(feeder_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    IfMatch(if_match): IfMatch,
) -> Result<impl IntoResponse, feeder::Error> {
    application.as_principal(&principal).feeder().delete(&feeder_id, &if_match).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn handle_put_feeder_api_secret(
    Path(feeder_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    IfMatch(if_match): IfMatch,
) -> Result<impl IntoResponse, feeder::Error> {
    let secret = application.as_principal(&principal).feeder().refresh_api_secret(&feeder_id, &if_match).await?;

    Ok((etag_header(secret.etag.clone()), Json(RefreshedFeederSecretResponse { feeder: secret.into() })))
}

#[debug_handler]
async fn handle_get_archived_feeders(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, feeder::Error> {
    let feeders = application.as_principal(&principal).feeder().get_archived().await?;

    Ok(Json(GetFeedersResponse {
        meta: Meta { count: feeders.len() as u64 },
        feeders: feeders.into_iter().map(FeederResponse::from).collect(),
    }))
}

#[debug_handler]
async fn handle_post_purge_feeders(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, feeder::Error> {
    application.as_principal(&principal).feeder().purge().await?;

    Ok(StatusCode::NO_CONTENT)
}

impl IntoResponse for feeder::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            feeder::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            feeder::Error::FeederNotExists => {
                error_response(StatusCode::NOT_FOUND, "FEEDER_NOT_EXISTS", "feeder is not exists.")
            }
            feeder::Error::Unauthorized => {
                error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "feeder is outside of principal's teams.")
            }
            feeder::Error::Conflict => error_response(
                StatusCode::CONFLICT,
                "CONFLICT",
                "feeder was modified concurrently or is already archived.",
            ),
            feeder::Error::FeederNameConflicted => {
                error_response(StatusCode::CONFLICT, "FEEDER_NAME_CONFLICTED", "feeder is already exists in the team.")
            }
            feeder::Error::IntegrityViolation => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, "INTEGRITY_VIOLATION", "team does not exist.")
            }
            feeder::Error::InvalidPayload(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message)
            }
            feeder::Error::InvalidQuery(message) => error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message),
        }
    }
}
