use axum::http::StatusCode;
use axum_thiserror::ErrorStatus;
use thiserror::Error;

#[derive(Debug, Error, ErrorStatus)]
pub enum AuthError {
    #[error("The 'Authorization' header was not present on a request")]
    #[status(StatusCode::UNAUTHORIZED)]
    MissingAuthorizationHeader,

    #[error("The 'Authorization' header was present on a request but its value could not be parsed. Reason: {0}")]
    #[status(StatusCode::UNAUTHORIZED)]
    InvalidAuthorizationHeader(String),

    #[error("The 'Authorization' header did not contain the expected 'Basic ...credentials' format")]
    #[status(StatusCode::UNAUTHORIZED)]
    MissingBasicCredentials,

    #[error("The credentials are not valid")]
    #[status(StatusCode::UNAUTHORIZED)]
    InvalidCredentials,

    #[error("The principal could not be resolved. Reason: {0}")]
    #[status(StatusCode::INTERNAL_SERVER_ERROR)]
    PrincipalResolution(String),
}
