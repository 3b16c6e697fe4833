//! Per-route request counting.

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use snapferry_telemetry::Metrics;

const UNMATCHED_ROUTE: &str = "unmatched";

/// Count the request under its route template and final status.
///
/// Raw paths are never used as labels; a request without a matched route is
/// counted as `unmatched`.
pub(crate) async fn record_http_request(
    State(telemetry): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_owned();
    let response = next.run(request).await;
    telemetry.inc_http_request(&route, response.status().as_u16());
    response
}
