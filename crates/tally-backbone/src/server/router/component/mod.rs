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
        component::{self, ComponentUseCase},
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
    request::PostComponentRequest,
    response::{ComponentResponse, GetComponentResponse, GetComponentsResponse},
};

mod request;
pub(crate) mod response;

pub(crate) fn router(application: Arc<Application>) -> axum::Router {
    let writer_router = Router::new()
        .route("/components", post(handle_post_component))
        .route_layer(middleware::from_fn_with_state(CATALOG_WRITERS, check_role));
    let member_router = Router::new()
        .route("/components", get(handle_get_components))
        .route("/components/:component_id", get(handle_get_component));

    Router::new().merge(member_router).merge(writer_router).with_state(application)
}

#[debug_handler]
async fn handle_post_component(
    State(application): State<Arc<Application>>,
    ValidJson(payload): ValidJson<PostComponentRequest>,
) -> Result<impl IntoResponse, component::Error> {
    let component = application.component().create(&payload.name, &payload.component_type).await?;

    Ok((
        StatusCode::CREATED,
        etag_header(component.etag.clone()),
        Json(GetComponentResponse { component: component.into() }),
    ))
}

#[debug_handler]
async fn handle_get_components(
    State(application): State<Arc<Application>>,
    Listing(query): Listing,
) -> Result<impl IntoResponse, component::Error> {
    let page = application.component().get_all(query).await?;

    Ok(Json(GetComponentsResponse {
        components: page.items.into_iter().map(ComponentResponse::from).collect(),
        meta: Meta { count: page.count },
    }))
}

#[debug_handler]
async fn handle_get_component(
    Path(component_id): Path<Uuid>,
    State(application): State<Arc<Application>>,
) -> Result<impl IntoResponse, component::Error> {
    let component = application.component().get(&component_id).await?;

    Ok((etag_header(component.etag.clone()), Json(GetComponentResponse { component: component.into() })))
}

impl IntoResponse for component::Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            component::Error::Anyhow(e) => handle_internal_server_error(&*e).into_response(),
            component::Error::ComponentNotExists => {
                error_response(StatusCode::NOT_FOUND, "COMPONENT_NOT_EXISTS", "component is not exists.")
            }
            component::Error::ComponentNameConflicted => {
                error_response(StatusCode::CONFLICT, "COMPONENT_NAME_CONFLICTED", "component is already exists.")
            }
            component::Error::InvalidPayload(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &message)
            }
            component::Error::InvalidQuery(message) => {
                error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &message)
            }
        }
    }
}
