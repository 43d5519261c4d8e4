pub mod authenticator;
pub mod error;
pub mod extractor;
pub mod layer;
pub mod service;

pub use authenticator::Authenticator;
pub use error::AuthError;
pub use extractor::{BasicAuthExtractor, Credentials, CredentialsExtractor};
pub use layer::TallyAuthLayer;
pub use service::TallyAuthService;
