use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use tally_auth::Principal;
use uuid::Uuid;

use crate::{
    application::{
        team::{self, TeamUseCase},
        Application,
    },
    server::{
        check_role,
        request::{Listing, ValidJson},
        response::{error_response, etag_header, handle_internal_server_error, Meta},
        SUPER_ADMIN_ONLY,
    },
};

use self::{
    request::PostTeamRequest,
    response::{GetTeamResponse, GetTeamsResponse, TeamResponse},
};

mod request;
pub(crate) mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let admin_router = Router::new()
        .route("/teams", post(handle_post_team))
        .route_layer(middleware::from_fn_with_state(SUPER_ADMIN_ONLY, check_role));
    let member_router =
        Router::new().route("/teams", get(handle_get_teams)).route("/teams/:team_id", get(handle_get_team));

    Router::new().merge(member_router).merge(admin_router).with_state(application)
}

#[debug_handler]
async fn handle_post_team(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    ValidJson(payload): ValidJson<PostTeamRequest>,
) -> Result<impl IntoResponse, team::Error> {
    let team = application.as_principal(&principal).team().create(payload.name, payload.parent_id).await?;

    Ok((StatusCode::CREATED, etag_header(team.etag.clone()), Json(GetTeamResponse { team: team.into() })))
}

#[debug_handler]
async fn handle_get_teams(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, team::Error> {
    let page = application.as_principal(&principal).team().get_all(query).await?;

    Ok(Json(GetTeamsResponse {
        teams: page.items.into_iter().map(TeamResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_team(
    Path(team_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, team::Error> {
    let team = application.as_principal(&principal).team().get(&team_id).await?;

    Ok((etag_header(team.etag.clone()), Json(GetTeamResponse { team: team.into() })))
}

impl IntoResponse for team::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            team::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            team::Error::TeamNotExists => error_response(StatusCode::NOT_FOUND, "TEAM_NOT_EXISTS", "team is not exists."),
            team::Error::Unauthorized => {
                error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "team is outside of principal's teams.")
            }
            team::Error::TeamNameConflicted => {
                error_response(StatusCode::CONFLICT, "TEAM_NAME_CONFLICTED", "team is already exists.")
            }
            team::Error::IntegrityViolation => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INTEGRITY_VIOLATION",
                "parent team does not exist.",
            ),
            team::Error::InvalidPayload(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message)
            }
            team::Error::InvalidQuery(message) => error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message),
        }
    }
}
