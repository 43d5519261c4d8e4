use std::{fmt, sync::Arc};

use axum::extract::Request;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::error::AuthError;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).field("password", &"<redacted>").finish()
    }
}

pub trait CredentialsExtractor: Send + Sync + fmt::Debug {
    fn extract(&self, request: &Request) -> Result<Credentials, AuthError>;
}

#[derive(Debug, Clone, Default)]
pub struct BasicAuthExtractor;

impl CredentialsExtractor for BasicAuthExtractor {
    fn extract(&self, request: &Request) -> Result<Credentials, AuthError> {
        let encoded = request
            .headers()
            .get("authorization")
            .ok_or(AuthError::MissingAuthorizationHeader)?
            .to_str()
            .map_err(|err| AuthError::InvalidAuthorizationHeader(err.to_string()))?
            .strip_prefix("Basic ")
            .ok_or(AuthError::MissingBasicCredentials)?;

        parse_basic_credentials(encoded.trim())
    }
}

fn parse_basic_credentials(encoded: &str) -> Result<Credentials, AuthError> {
    let decoded = STANDARD.decode(encoded).map_err(|err| AuthError::InvalidAuthorizationHeader(err.to_string()))?;
    let decoded = String::from_utf8(decoded).map_err(|err| AuthError::InvalidAuthorizationHeader(err.to_string()))?;
    let (username, password) = decoded.split_once(':').ok_or(AuthError::MissingBasicCredentials)?;
    if username.is_empty() {
        return Err(AuthError::MissingBasicCredentials);
    }

    Ok(Credentials { username: username.to_owned(), password: password.to_owned() })
}

pub(crate) fn extract_credentials(
    request: &Request,
    extractor: Arc<dyn CredentialsExtractor + Send + Sync>,
) -> Result<Credentials, AuthError> {
    extractor.extract(request).inspect_err(|err| tracing::debug!(?extractor, ?err, "Extractor failed"))
}

#[cfg(test)]
mod test {
    use axum::{body::Body, extract::Request};
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    use super::{AuthError, BasicAuthExtractor, Credentials, CredentialsExtractor};

    fn request_with_authorization(value: &str) -> Request {
        Request::builder().uri("/").header("authorization", value).body(Body::empty()).unwrap()
    }

    #[test]
    fn when_basic_header_is_valid_then_extractor_returns_credentials() {
        let request = request_with_authorization(&format!("Basic {}", STANDARD.encode("admin:s3cr:et")));

        let credentials = BasicAuthExtractor.extract(&request).expect("extracting credentials should be successful");

        assert_eq!(credentials, Credentials { username: "admin".to_owned(), password: "s3cr:et".to_owned() });
    }

    #[test]
    fn when_header_is_missing_then_extractor_returns_missing_authorization_header_err() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let result = BasicAuthExtractor.extract(&request);

        assert!(matches!(result, Err(AuthError::MissingAuthorizationHeader)));
    }

    #[test]
    fn when_scheme_is_not_basic_then_extractor_returns_missing_basic_credentials_err() {
        let request = request_with_authorization("Bearer some.jwt.token");

        let result = BasicAuthExtractor.extract(&request);

        assert!(matches!(result, Err(AuthError::MissingBasicCredentials)));
    }

    #[test]
    fn when_payload_is_not_base64_then_extractor_returns_invalid_authorization_header_err() {
        let request = request_with_authorization("Basic !!!");

        let result = BasicAuthExtractor.extract(&request);

        assert!(matches!(result, Err(AuthError::InvalidAuthorizationHeader(_))));
    }

    #[test]
    fn when_payload_has_no_separator_then_extractor_returns_missing_basic_credentials_err() {
        let request = request_with_authorization(&format!("Basic {}", STANDARD.encode("admin")));

        let result = BasicAuthExtractor.extract(&request);

        assert!(matches!(result, Err(AuthError::MissingBasicCredentials)));
    }

    #[test]
    fn when_debug_printing_credentials_then_password_is_redacted() {
        let credentials = Credentials { username: "admin".to_owned(), password: "hunter2".to_owned() };

        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
