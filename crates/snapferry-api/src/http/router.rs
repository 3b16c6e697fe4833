//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    middleware,
    routing::{get, post},
};
use axum_server::tls_rustls::RustlsConfig;
use snapferry_config::TlsFiles;
use snapferry_telemetry::build_sha;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::auth::require_basic_auth;
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::health::{health, metrics};
use crate::http::telemetry::record_http_request;
use crate::http::transfers::{backup, restore};
use crate::state::ApiState;

/// Axum router wrapper that hosts the snapferry API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router with request-id, tracing, metrics, and auth layers.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let telemetry = state.telemetry.clone();
        let state = Arc::new(state);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(snapferry_telemetry::set_request_id_layer())
            .layer(snapferry_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(
                telemetry,
                record_http_request,
            ));

        let router = Self::public_routes()
            .merge(Self::transfer_routes(&state))
            .route_layer(layered)
            .with_state(state);
        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn transfer_routes(state: &Arc<ApiState>) -> Router<Arc<ApiState>> {
        let require_auth = middleware::from_fn_with_state(state.clone(), require_basic_auth);
        Router::new()
            .route("/backup", post(backup))
            .route("/restore", post(restore))
            .route_layer(require_auth)
    }

    /// Bind `addr` and serve until the listener fails or the future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Bind`] when the address cannot be bound and
    /// [`ApiServerError::Serve`] when the accept loop terminates with an error.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::LocalAddr`] when the listener cannot report
    /// its address and [`ApiServerError::Serve`] when the accept loop
    /// terminates with an error.
    pub async fn serve_on(self, listener: TcpListener) -> ApiServerResult<()> {
        let addr = listener
            .local_addr()
            .map_err(|source| ApiServerError::LocalAddr { source })?;
        tracing::info!(%addr, "agent api listening");
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// Bind `addr` and serve HTTPS with the PEM identity in `tls`.
    ///
    /// The identity is loaded before the address is bound. Protocol versions
    /// below TLS 1.2 are never negotiated.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Tls`] when the certificate chain or key
    /// cannot be loaded and [`ApiServerError::Serve`] when binding or the
    /// accept loop fails.
    pub async fn serve_tls(self, addr: SocketAddr, tls: &TlsFiles) -> ApiServerResult<()> {
        let identity = load_tls_identity(tls).await?;
        tracing::info!(%addr, cert = %tls.cert_file.display(), "agent api listening with tls");
        axum_server::bind_rustls(addr, identity)
            .serve(self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

async fn load_tls_identity(tls: &TlsFiles) -> ApiServerResult<RustlsConfig> {
    // Another crate in the process may have installed a provider already.
    let _ = rustls::crypto::ring::default_provider().install_default();
    RustlsConfig::from_pem_file(&tls.cert_file, &tls.key_file)
        .await
        .map_err(|source| ApiServerError::Tls {
            cert_file: tls.cert_file.clone(),
            key_file: tls.key_file.clone(),
            source,
        })
}
