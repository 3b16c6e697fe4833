//! Shared HTTP constants (headers, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const BASIC_SCHEME: &str = "Basic";
pub(crate) const BASIC_CHALLENGE: &str = "Basic realm=\"snapferry\"";
pub(crate) const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub(crate) const PROBLEM_INTERNAL: &str = "https://snapferry.dev/problems/internal";
pub(crate) const PROBLEM_UNAUTHORIZED: &str = "https://snapferry.dev/problems/unauthorized";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://snapferry.dev/problems/bad-request";
