use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use tally_auth::Principal;

use crate::{
    application::{
        user::{self, CreatingUserCommand, UserUseCase},
        Application,
    },
    server::{
        check_role,
        request::ValidJson,
        response::{error_response, etag_header, handle_internal_server_error},
        SUPER_ADMIN_ONLY,
    },
};

use self::{
    request::PostUserRequest,
    response::{GetIdentityResponse, GetUserResponse},
};

mod request;
mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let admin_router = Router::new()
        .route("/users", post(handle_post_user))
        .route_layer(middleware::from_fn_with_state(SUPER_ADMIN_ONLY, check_role));

    Router::new().route("/identity", get(handle_get_identity)).merge(admin_router).with_state(application)
}

#[debug_handler]
async fn handle_post_user(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    ValidJson(payload): ValidJson<PostUserRequest>,
) -> Result<impl IntoResponse, user::Error> {
    let user = application.as_principal(&principal).user().create(payload.into()).await?;

    Ok((StatusCode::CREATED, etag_header(user.etag.clone()), Json(GetUserResponse { user: user.into() })))
}

impl From<PostUserRequest> for CreatingUserCommand {
    fn from(value: PostUserRequest) -> Self {
        Self { name: value.name, password: value.password, role_id: value.role_id, team_id: value.team_id }
    }
}

#[debug_handler]
async fn handle_get_identity(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    let identity = application.as_principal(&principal).user().identity();

    Json(GetIdentityResponse { identity: identity.into() })
}

impl IntoResponse for user::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            user::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            user::Error::UserNameConflicted => {
                error_response(StatusCode::CONFLICT, "USER_NAME_CONFLICTED", "user is already exists.")
            }
            user::Error::IntegrityViolation => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INTEGRITY_VIOLATION",
                "referenced role or team does not exist.",
            ),
            user::Error::InvalidPayload(message) => error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message),
        }
    }
}
