use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{header::IF_MATCH, request::Parts, StatusCode},
    response::Response,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::domain::query::ListQuery;

use super::response::error_response;

/// The etag a client last observed, taken from the `If-Match` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IfMatch(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IfMatch {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IF_MATCH)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(|value| IfMatch(value.trim().to_owned()))
            .ok_or_else(|| {
                error_response(StatusCode::PRECONDITION_FAILED, "IF_MATCH_REQUIRED", "If-Match header is required.")
            })
    }
}

/// JSON body whose malformed or unexpected content answers 400.
pub(crate) struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(invalid_payload(&rejection)),
        }
    }
}

fn invalid_payload(rejection: &JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", &rejection.body_text())
}

#[derive(Deserialize, Debug, Default)]
struct ListParams {
    #[serde(rename = "where")]
    filter: Option<String>,
    sort: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    embed: Option<String>,
}

/// `where`, `sort`, `limit`, `offset` and `embed` query parameters.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Listing(pub ListQuery);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Listing {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ListParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &e.body_text()))?;

        ListQuery::parse(
            params.filter.as_deref(),
            params.sort.as_deref(),
            params.limit,
            params.offset,
            params.embed.as_deref(),
        )
        .map(Listing)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, "INVALID_QUERY", &e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use axum::{
        body::Body,
        extract::{FromRequest, FromRequestParts, Request},
        http::StatusCode,
    };
    use serde::Deserialize;

    use super::{IfMatch, Listing, ValidJson};
    use crate::domain::query::ListQuery;

    #[derive(Deserialize, Debug)]
    #[serde(deny_unknown_fields)]
    struct Payload {
        #[allow(dead_code)]
        name: Option<String>,
    }

    #[tokio::test]
    async fn when_if_match_is_missing_then_extractor_rejects_with_precondition_failed() {
        let (mut parts, _) = Request::builder().uri("/").body(Body::empty()).unwrap().into_parts();

        let rejection = IfMatch::from_request_parts(&mut parts, &()).await.unwrap_err();

        assert_eq!(rejection.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn when_if_match_is_present_then_extractor_keeps_raw_value() {
        let (mut parts, _) =
            Request::builder().uri("/").header("if-match", "\"abc\"").body(Body::empty()).unwrap().into_parts();

        let if_match = IfMatch::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(if_match, IfMatch("\"abc\"".to_owned()));
    }

    #[tokio::test]
    async fn when_query_has_filters_then_listing_parses_them() {
        let (mut parts, _) = Request::builder()
            .uri("/feeders?where=name:nightly&sort=-created_at&limit=10&embed=team")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let Listing(query) = Listing::from_request_parts(&mut parts, &()).await.unwrap();

        let expected = ListQuery::parse(Some("name:nightly"), Some("-created_at"), Some(10), None, Some("team")).unwrap();
        assert_eq!(query, expected);
    }

    #[tokio::test]
    async fn when_where_clause_is_malformed_then_listing_rejects_with_bad_request() {
        let (mut parts, _) =
            Request::builder().uri("/feeders?where=name").body(Body::empty()).unwrap().into_parts();

        let rejection = Listing::from_request_parts(&mut parts, &()).await.unwrap_err();

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn when_limit_exceeds_bigint_then_listing_rejects_with_bad_request() {
        let (mut parts, _) = Request::builder()
            .uri("/feeders?limit=9223372036854775808")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let rejection = Listing::from_request_parts(&mut parts, &()).await.unwrap_err();

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn when_body_has_unknown_field_then_valid_json_rejects_with_bad_request() {
        let request = Request::builder()
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"label": "ADMIN"}"#))
            .unwrap();

        let rejection = ValidJson::<Payload>::from_request(request, &()).await.err().unwrap();

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }
}
