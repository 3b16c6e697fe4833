//! Problem-document errors returned by handlers and middleware.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};

use crate::http::constants::{
    BASIC_CHALLENGE, PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_UNAUTHORIZED,
};
use crate::models::ProblemDetails;

/// Problem categories the agent can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Problem {
    BadRequest,
    Unauthorized,
    Internal,
}

impl Problem {
    const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn uri(self) -> &'static str {
        match self {
            Self::BadRequest => PROBLEM_BAD_REQUEST,
            Self::Unauthorized => PROBLEM_UNAUTHORIZED,
            Self::Internal => PROBLEM_INTERNAL,
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "request body rejected",
            Self::Unauthorized => "credentials required",
            Self::Internal => "transfer agent error",
        }
    }
}

/// Handler error rendered as `application/problem+json`-shaped JSON.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) problem: Problem,
    detail: String,
}

impl ApiError {
    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self {
            problem: Problem::Internal,
            detail: detail.into(),
        }
    }

    pub(crate) fn unauthorized(detail: impl Into<String>) -> Self {
        Self {
            problem: Problem::Unauthorized,
            detail: detail.into(),
        }
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            problem: Problem::BadRequest,
            detail: detail.into(),
        }
    }

    pub(crate) const fn status(&self) -> StatusCode {
        self.problem.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ProblemDetails {
            kind: self.problem.uri().to_owned(),
            title: self.problem.title().to_owned(),
            status: status.as_u16(),
            detail: Some(self.detail),
        };
        let mut response = (status, Json(body)).into_response();
        if self.problem == Problem::Unauthorized {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
        }
        response
    }
}
