use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use tally_auth::Principal;
use uuid::Uuid;

use crate::{
    application::{
        role::{self, CreatingRoleCommand, RoleUseCase, UpdatingRoleCommand},
        Application,
    },
    server::{
        check_role,
        request::{IfMatch, Listing, ValidJson},
        response::{error_response, etag_header, handle_internal_server_error, Meta},
        SUPER_ADMIN_ONLY,
    },
};

use self::{
    request::{PostRolePermissionRequest, PostRoleRequest, PutRoleRequest},
    response::{GetRoleResponse, GetRolesResponse, RoleResponse},
};

mod request;
mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let admin_router = Router::new()
        .route("/roles", post(handle_post_role))
        .route("/roles/purge", get(handle_get_archived_roles).post(handle_post_purge_roles))
        .route("/roles/:role_id", put(handle_put_role).delete(handle_delete_role))
        .route("/roles/:role_id/permissions", post(handle_post_role_permission))
        .route("/roles/:role_id/permissions/:permission_id", delete(handle_delete_role_permission))
        .route_layer(middleware::from_fn_with_state(SUPER_ADMIN_ONLY, check_role));
    let member_router =
        Router::new().route("/roles", get(handle_get_roles)).route("/roles/:role_id", get(handle_get_role));

    Router::new().merge(member_router).merge(admin_router).with_state(application)
}

#[debug_handler]
async fn handle_post_role(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    ValidJson(payload): ValidJson<PostRoleRequest>,
) -> Result<impl IntoResponse, role::Error> {
    let role = application.as_principal(&principal).role().create(payload.into()).await?;

    Ok((StatusCode::CREATED, etag_header(role.etag.clone()), Json(GetRoleResponse { role: role.into() })))
}

impl From<PostRoleRequest> for CreatingRoleCommand {
    fn from(value: PostRoleRequest) -> Self {
        Self { name: value.name, label: value.label, description: value.description }
    }
}

#[debug_handler]
async fn handle_get_roles(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, role::Error> {
    let page = application.as_principal(&principal).role().get_all(query).await?;

    Ok(Json(GetRolesResponse {
        roles: page.items.into_iter().map(RoleResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_role(
    Path(role_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, role::Error> {
    let role = application.as_principal(&principal).role().get(&role_id, query).await?;

    Ok((etag_header(role.etag.clone()), Json(GetRoleResponse { role: role.into() })))
}

#[debug_handler]
async fn handle_put_role(
    Path(role_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    IfMatch(if_match): IfMatch,
    ValidJson(payload): ValidJson<PutRoleRequest>,
) -> Result<impl IntoResponse, role::Error> {
    let etag = application.as_principal(&principal).role().update(&role_id, &if_match, payload.into()).await?;

    Ok((StatusCode::NO_CONTENT, etag_header(etag)))
}

impl From<PutRoleRequest> for UpdatingRoleCommand {
    fn from(value: PutRoleRequest) -> Self {
        Self { name: value.name, description: value.description }
    }
}

#[debug_handler]
async fn handle_delete_role(
    Path(role_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    IfMatch(if_match): IfMatch,
) -> Result<impl IntoResponse, role::Error> {
    application.as_principal(&principal).role().delete(&role_id, &if_match).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn handle_get_archived_roles(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, role::Error> {
    let roles = application.as_principal(&principal).role().get_archived().await?;

    Ok(Json(GetRolesResponse {
        meta: Meta { count: roles.len() as u64 },
        roles: roles.into_iter().map(RoleResponse::from).collect(),
    }))
}

#[debug_handler]
async fn handle_post_purge_roles(
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, role::Error> {
    application.as_principal(&principal).role().purge().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn handle_post_role_permission(
    Path(role_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
    ValidJson(payload): ValidJson<PostRolePermissionRequest>,
) -> Result<impl IntoResponse, role::Error> {
    application.as_principal(&principal).role().attach_permission(&role_id, &payload.permission_id).await?;

    Ok(StatusCode::CREATED)
}

#[debug_handler]
async fn handle_delete_role_permission(
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
    State(application): State<Arc<Application>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, role::Error> {
    application.as_principal(&principal).role().detach_permission(&role_id, &permission_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

impl IntoResponse for role::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            role::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            role::Error::RoleNotExists => error_response(StatusCode::NOT_FOUND, "ROLE_NOT_EXISTS", "role is not exists."),
            role::Error::Unauthorized => {
                error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "role is not visible to principal.")
            }
            role::Error::Conflict => error_response(
                StatusCode::CONFLICT,
                "CONFLICT",
                "role was modified concurrently or is already archived.",
            ),
            role::Error::RoleLabelConflicted => {
                error_response(StatusCode::CONFLICT, "ROLE_LABEL_CONFLICTED", "role is already exists.")
            }
            role::Error::AlreadyLinked => error_response(
                StatusCode::CONFLICT,
                "PERMISSION_ALREADY_ATTACHED",
                "permission is already attached to role.",
            ),
            role::Error::NotLinked => error_response(
                StatusCode::CONFLICT,
                "PERMISSION_NOT_ATTACHED",
                "permission is not attached to role.",
            ),
            role::Error::IntegrityViolation => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INTEGRITY_VIOLATION",
                "referenced permission does not exist or role is still in use.",
            ),
            role::Error::InvalidPayload(message) => error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message),
            role::Error::InvalidQuery(message) => error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message),
        }
    }
}
