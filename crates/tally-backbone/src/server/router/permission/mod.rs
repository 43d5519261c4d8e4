use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::{
    application::{
        permission::{self, CreatingPermissionCommand, PermissionUseCase, UpdatingPermissionCommand},
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
    request::{PostPermissionRequest, PutPermissionRequest},
    response::{GetPermissionResponse, GetPermissionsResponse, PermissionResponse},
};

mod request;
pub(crate) mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    Router::new()
        .route("/permissions", get(handle_get_permissions).post(handle_post_permission))
        .route(
            "/permissions/:permission_id",
            get(handle_get_permission).put(handle_put_permission).delete(handle_delete_permission),
        )
        .route_layer(middleware::from_fn_with_state(SUPER_ADMIN_ONLY, check_role))
        .with_state(application)
}

#[debug_handler]
async fn handle_post_permission(
    State(application): State<Arc<Application>>,
    ValidJson(payload): ValidJson<PostPermissionRequest>,
) -> Result<impl IntoResponse, permission::Error> {
    let permission = application.permission().create(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        etag_header(permission.etag.clone()),
        Json(GetPermissionResponse { permission: permission.into() }),
    ))
}

impl From<PostPermissionRequest> for CreatingPermissionCommand {
    fn from(value: PostPermissionRequest) -> Self {
        Self { name: value.name, label: value.label, description: value.description }
    }
}

#[debug_handler]
async fn handle_get_permissions(
    State(application): State<Arc<Application>>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, permission::Error> {
    let page = application.permission().get_all(query).await?;

    Ok(Json(GetPermissionsResponse {
        permissions: page.items.into_iter().map(PermissionResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_permission(
    Path(permission_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
) -> Result<impl IntoResponse, permission::Error> {
    let permission = application.permission().get(&permission_id).await?;

    Ok((etag_header(permission.etag.clone()), Json(GetPermissionResponse { permission: permission.into() })))
}

#[debug_handler]
async fn handle_put_permission(
    Path(permission_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    IfMatch(if_match): IfMatch,
    ValidJson(payload): ValidJson<PutPermissionRequest>,
) -> Result<impl IntoResponse, permission::Error> {
    let etag = application.permission().update(&permission_id, &if_match, payload.into()).await?;

    Ok((StatusCode::NO_CONTENT, etag_header(etag)))
}

impl From<PutPermissionRequest> for UpdatingPermissionCommand {
    fn from(value: PutPermissionRequest) -> Self {
        Self { name: value.name, description: value.description }
    }
}

#[debug_handler]
async fn handle_delete_permission(
    Path(permission_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
    IfMatch(if_match): IfMatch,
) -> Result<impl IntoResponse, permission::Error> {
    application.permission().delete(&permission_id, &if_match).await?;

    Ok(StatusCode::NO_CONTENT)
}

impl IntoResponse for permission::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            permission::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            permission::Error::PermissionNotExists => {
                error_response(StatusCode::NOT_FOUND, "PERMISSION_NOT_EXISTS", "permission is not exists.")
            }
            permission::Error::Conflict => error_response(
                StatusCode::CONFLICT,
                "CONFLICT",
                "permission was modified concurrently or is already archived.",
            ),
            permission::Error::PermissionLabelConflicted => {
                error_response(StatusCode::CONFLICT, "PERMISSION_LABEL_CONFLICTED", "permission is already exists.")
            }
            permission::Error::InvalidPayload(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message)
            }
            permission::Error::InvalidQuery(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message)
            }
        }
    }
}
