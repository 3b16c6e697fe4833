//! `x-request-id` middleware for the agent's HTTP surface.
//!
//! Requests arriving without an id get a fresh UUID; an id supplied by the
//! caller is kept. Either way the id is echoed on the response.

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Layer that stamps a UUID `x-request-id` on requests arriving without one.
/// Install it outside [`propagate_request_id_layer`] so generated ids reach
/// the response.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that echoes the request's `x-request-id` on the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
