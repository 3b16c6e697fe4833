//! Request seam and the unix-socket HTTP client behind it.
//!
//! # Design
//! - Every request opens its own connection, so concurrent transfers never
//!   queue behind each other on one socket.
//! - Request and response bodies are streamed; nothing is buffered here.
//! - Server information is fetched once and cached for the process lifetime.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, StreamBody};
use hyper::body::Frame;
use hyper::header::HOST;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use snapferry_config::HostSettings;
use snapferry_core::{ByteStream, TransferError, TransferResult, collect_stream};
use tokio::net::UnixStream;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{HostError, HostResult};
use crate::protocol::{ServerInfo, decode, endpoint_path};

const HOST_AUTHORITY: &str = "unix.socket";

/// Request addressed to the host REST API.
pub struct HostRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute path, already percent-encoded.
    pub path: String,
    /// Extra request headers.
    pub headers: Vec<(&'static str, String)>,
    /// Streamed request body.
    pub body: Option<ByteStream>,
}

impl HostRequest {
    /// `GET` without a body.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// `POST` streaming `body`.
    #[must_use]
    pub fn post(path: impl Into<String>, body: ByteStream) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

impl fmt::Debug for HostRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HostRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("streamed_body", &self.body.is_some())
            .finish()
    }
}

/// Response head plus the still-unread body.
pub struct HostResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body; dropping it closes the connection.
    pub body: ByteStream,
}

impl HostResponse {
    /// Whether the status is below 300.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status < 300
    }

    /// Drain a small JSON body and decode the host envelope.
    pub(crate) async fn envelope<T>(self) -> HostResult<crate::protocol::Envelope<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = collect_stream(self.body)
            .await
            .map_err(|source| HostError::Body { source })?;
        decode(&body)
    }
}

impl fmt::Debug for HostResponse {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HostResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Connection to the host REST API.
#[async_trait]
pub trait HostTransport: Send + Sync {
    /// Server information, including the advertised API extensions.
    async fn server_info(&self) -> HostResult<ServerInfo>;

    /// Send one request and return the response head with a live body.
    async fn send(&self, request: HostRequest) -> HostResult<HostResponse>;
}

/// HTTP/1.1 over the host's local unix socket.
#[derive(Debug)]
pub struct UnixSocketTransport {
    socket_path: PathBuf,
    server_info: OnceCell<ServerInfo>,
}

impl UnixSocketTransport {
    /// Transport for the socket named in `settings`.
    #[must_use]
    pub fn new(settings: &HostSettings) -> Self {
        Self::at(&settings.socket_path)
    }

    /// Transport for the socket at `socket_path`.
    #[must_use]
    pub fn at(socket_path: &Path) -> Self {
        Self {
            socket_path: socket_path.to_path_buf(),
            server_info: OnceCell::new(),
        }
    }

    async fn fetch_server_info(&self) -> HostResult<ServerInfo> {
        let response = self.send(HostRequest::get(endpoint_path(&["1.0"])?)).await?;
        if !response.is_success() {
            return Err(HostError::Status {
                operation: "server_info",
                status: response.status,
            });
        }
        let envelope = response.envelope::<ServerInfo>().await?;
        let info = envelope.metadata.unwrap_or_default();
        debug!(
            extensions = info.api_extensions.len(),
            "host server information cached"
        );
        Ok(info)
    }
}

#[async_trait]
impl HostTransport for UnixSocketTransport {
    async fn server_info(&self) -> HostResult<ServerInfo> {
        self.server_info
            .get_or_try_init(|| self.fetch_server_info())
            .await
            .cloned()
    }

    async fn send(&self, request: HostRequest) -> HostResult<HostResponse> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| HostError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|source| HostError::Handshake { source })?;
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                debug!(error = %error, "host connection closed with error");
            }
        });

        let HostRequest {
            method,
            path,
            headers,
            body,
        } = request;
        let body: UnsyncBoxBody<Bytes, io::Error> = match body {
            Some(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
            None => Empty::<Bytes>::new()
                .map_err(|never| match never {})
                .boxed_unsync(),
        };
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(path.as_str())
            .header(HOST, HOST_AUTHORITY);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(body)
            .map_err(|source| HostError::Request { source })?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|source| HostError::Send { source })?;
        let status = response.status().as_u16();
        debug!(method = %method, path = %path, status, "host responded");
        let body = response.into_body().into_data_stream().map_err(io::Error::other);
        Ok(HostResponse {
            status,
            body: Box::pin(body),
        })
    }
}

/// Fetch server information and fail with `CapabilityMissing` unless the
/// host advertises `extension`.
pub(crate) async fn require_extension(
    transport: &dyn HostTransport,
    extension: &'static str,
) -> TransferResult<ServerInfo> {
    let info = transport
        .server_info()
        .await
        .map_err(|err| TransferError::host("server_info", err))?;
    if !info.has_extension(extension) {
        warn!(extension, "host lacks required API extension");
        return Err(TransferError::CapabilityMissing {
            capability: extension,
        });
    }
    Ok(info)
}
