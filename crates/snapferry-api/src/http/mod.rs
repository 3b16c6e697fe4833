//! HTTP surface modules (router, middleware, handlers).

/// Basic authentication middleware.
pub mod auth;
/// Shared constants and problem URIs.
pub mod constants;
/// Problem response helpers and error types.
pub mod errors;
/// Health and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
/// Backup and restore handlers.
pub mod transfers;
