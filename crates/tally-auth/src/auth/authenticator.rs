use crate::principal::Principal;

use super::{error::AuthError, extractor::Credentials};

/// Resolves the principal behind a set of credentials.
#[async_trait::async_trait]
pub trait Authenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError>;
}
