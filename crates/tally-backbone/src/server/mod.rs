use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MATCH},
        StatusCode,
    },
    middleware::Next,
    response::Response,
    routing::get,
    Extension, Router,
};
use tally_auth::{auth::TallyAuthLayer, Principal, RoleLabel};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::{
    application::Application,
    config::{ApplicationConfig, CorsConfig},
};

use self::response::error_response;

mod request;
mod response;
mod router;

pub(crate) const SUPER_ADMIN_ONLY: &[RoleLabel] = &[RoleLabel::SuperAdmin];
pub(crate) const CATALOG_WRITERS: &[RoleLabel] = &[RoleLabel::SuperAdmin, RoleLabel::ProductOwner];

pub(super) struct ServerConfig {
    pub port: u16,
    pub cors: Option<CorsConfig>,
}

impl From<&ApplicationConfig> for ServerConfig {
    fn from(value: &ApplicationConfig) -> Self {
        Self { port: value.port, cors: value.cors.clone() }
    }
}

pub(super) async fn run(application: Application, config: ServerConfig) -> anyhow::Result<()> {
    let application = Arc::new(application);

    let app = Router::new()
        .route("/health", get(|| async { "" }))
        .nest("/api/v1", api_router(application))
        .layer(TraceLayer::new_for_http());
    let app = match config.cors {
        Some(cors) => app.layer(cors_layer(cors)),
        None => app,
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    debug!("starting backbone server on {}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

fn api_router(application: Arc<Application>) -> Router {
    Router::new()
        .merge(router::feeder::router(application.clone()))
        .merge(router::jobdefinition::router(application.clone()))
        .merge(router::role::router(application.clone()))
        .merge(router::permission::router(application.clone()))
        .merge(router::team::router(application.clone()))
        .merge(router::user::router(application.clone()))
        .merge(router::component::router(application.clone()))
        .merge(router::ci_test::router(application.clone()))
        .layer(TallyAuthLayer::builder().authenticator(application.authenticator()).build())
}

fn cors_layer(cors: CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(match cors {
            CorsConfig::AllowAll => AllowOrigin::any(),
            CorsConfig::AllowList(allow_origins) => {
                AllowOrigin::predicate(move |value, _| origin_allowed(&allow_origins, value.as_bytes()))
            }
        })
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, IF_MATCH])
        .expose_headers([ETAG])
}

/// An allow-list entry matches exactly, or around a single `*` wildcard.
fn origin_allowed(allow_origins: &[String], value: &[u8]) -> bool {
    allow_origins.iter().any(|origin| match origin.split_once('*') {
        Some((prefix, suffix)) if !suffix.contains('*') => {
            value.len() >= prefix.len() + suffix.len()
                && value.starts_with(prefix.as_bytes())
                && value.ends_with(suffix.as_bytes())
        }
        _ => origin.as_bytes() == value,
    })
}

/// Rejects principals whose role is not among `roles`.
pub(crate) async fn check_role(
    State(roles): State<&'static [RoleLabel]>,
    Extension(principal): Extension<Principal>,
    req: Request,
    next: Next,
) -> Response {
    if principal.has_role(roles) {
        next.run(req).await
    } else {
        debug!(principal = %principal.name, role = %principal.role, "role gate rejected request");
        error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "principal is not allowed to perform this action.")
    }
}
