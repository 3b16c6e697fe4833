//! HTTP Basic authentication guard for the transfer routes.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose};
use tracing::warn;

use crate::http::constants::BASIC_SCHEME;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn require_basic_auth(
    State(state): State<Arc<ApiState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let (username, password) = basic_credentials(req.headers())?;
    if !state.credentials.matches(&username, &password) {
        warn!(route = %req.uri().path(), "rejected request with invalid credentials");
        return Err(ApiError::unauthorized("invalid credentials"));
    }
    Ok(next.run(req).await)
}

/// Decode the `user:password` pair from an `Authorization: Basic` header.
pub(crate) fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing basic credentials"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("authorization header must be valid UTF-8"))?;
    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| ApiError::unauthorized("malformed authorization header"))?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(ApiError::unauthorized("basic authentication required"));
    }
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| ApiError::unauthorized("basic credentials were not valid base64"))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| ApiError::unauthorized("basic credentials must be valid UTF-8"))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| ApiError::unauthorized("basic credentials must be user:password"))?;
    Ok((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn decodes_basic_pair() -> Result<(), ApiError> {
        // "agent:pa:ss" keeps everything after the first colon as the password.
        let headers = headers_with("Basic YWdlbnQ6cGE6c3M=");
        let (username, password) = basic_credentials(&headers)?;
        assert_eq!(username, "agent");
        assert_eq!(password, "pa:ss");
        Ok(())
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let headers = headers_with("basic YWdlbnQ6cGFzcw==");
        assert!(basic_credentials(&headers).is_ok());
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert!(basic_credentials(&HeaderMap::new()).is_err());
        for value in ["Bearer abc", "Basic", "Basic !!!", "Basic YWdlbnQ="] {
            let headers = headers_with(value);
            let err = basic_credentials(&headers).err();
            assert_eq!(
                err.map(|err| err.status()),
                Some(axum::http::StatusCode::UNAUTHORIZED),
                "header {value:?}"
            );
        }
    }
}
