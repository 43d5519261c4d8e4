use std::task::{Context, Poll};

use axum::{body::Body, extract::Request, response::IntoResponse};
use futures_util::future::BoxFuture;

use super::{extractor, layer::TallyAuthLayer};

#[derive(Clone)]
pub struct TallyAuthService<S> {
    inner: S,
    layer: TallyAuthLayer,
}

impl<S> TallyAuthService<S> {
    pub fn new(inner: S, layer: &TallyAuthLayer) -> Self {
        Self { inner, layer: layer.clone() }
    }
}

impl<S> tower::Service<Request<Body>> for TallyAuthService<S>
where
    S: tower::Service<Request<Body>, Response = axum::response::Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let layer = self.layer.clone();
        Box::pin(async move {
            let result = match extractor::extract_credentials(&request, layer.credentials_extractor.clone()) {
                Ok(credentials) => layer.resolve_principal(&credentials).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(principal) => {
                    tracing::debug!(principal = %principal.name, role = %principal.role, "request authenticated");
                    request.extensions_mut().insert(principal);
                    inner.call(request).await
                }
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::Request,
        http::StatusCode,
        routing::get,
        Extension, Router,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        auth::{AuthError, Authenticator, Credentials, TallyAuthLayer},
        Principal, RoleLabel,
    };

    struct StaticAuthenticator;

    #[async_trait::async_trait]
    impl Authenticator for StaticAuthenticator {
        async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
            if credentials.username == "admin" && credentials.password == "admin" {
                let team_id = Uuid::new_v4();
                Ok(Principal {
                    id: Uuid::new_v4(),
                    name: "admin".to_owned(),
                    role_id: Uuid::new_v4(),
                    role: RoleLabel::SuperAdmin,
                    team_id,
                    teams: vec![team_id],
                })
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn router() -> Router {
        Router::new()
            .route("/whoami", get(|Extension(principal): Extension<Principal>| async move { principal.name }))
            .layer(TallyAuthLayer::builder().authenticator(Arc::new(StaticAuthenticator)).build())
    }

    fn request(authorization: Option<&str>) -> Request {
        let builder = Request::builder().uri("/whoami");
        let builder = match authorization {
            Some(value) => builder.header("authorization", value),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn when_credentials_are_valid_then_principal_reaches_the_handler() {
        let authorization = format!("Basic {}", STANDARD.encode("admin:admin"));

        let response = router().oneshot(request(Some(&authorization))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn when_credentials_are_invalid_then_layer_responds_unauthorized() {
        let authorization = format!("Basic {}", STANDARD.encode("admin:wrong"));

        let response = router().oneshot(request(Some(&authorization))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn when_authorization_header_is_missing_then_layer_responds_unauthorized() {
        let response = router().oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
