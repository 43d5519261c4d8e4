use std::sync::Arc;

use bon::Builder;
use tower::Layer;

use crate::principal::Principal;

use super::{
    authenticator::Authenticator,
    error::AuthError,
    extractor::{BasicAuthExtractor, Credentials, CredentialsExtractor},
    service::TallyAuthService,
};

#[derive(Builder, Clone)]
pub struct TallyAuthLayer {
    pub authenticator: Arc<dyn Authenticator + Send + Sync>,

    #[builder(default = Arc::new(BasicAuthExtractor))]
    pub credentials_extractor: Arc<dyn CredentialsExtractor + Send + Sync>,
}

impl TallyAuthLayer {
    pub async fn resolve_principal(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        self.authenticator.authenticate(credentials).await
    }
}

impl<S> Layer<S> for TallyAuthLayer {
    type Service = TallyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TallyAuthService::new(inner, self)
    }
}
