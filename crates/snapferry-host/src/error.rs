//! Errors raised while talking to the virtualization host.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for host transport results.
pub type HostResult<T> = Result<T, HostError>;

/// Transport-level failures. Collaborators wrap these in
/// `TransferError::Host` with the operation that failed.
#[derive(Debug, Error)]
pub enum HostError {
    /// Connecting to the host socket failed.
    #[error("failed to connect to host socket")]
    Connect {
        /// Socket path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The HTTP/1 handshake over the socket failed.
    #[error("host connection handshake failed")]
    Handshake {
        /// Underlying hyper error.
        #[source]
        source: hyper::Error,
    },
    /// The outgoing request could not be built.
    #[error("failed to build host request")]
    Request {
        /// Underlying http error.
        #[source]
        source: hyper::http::Error,
    },
    /// Sending the request or receiving the response head failed.
    #[error("host request failed")]
    Send {
        /// Underlying hyper error.
        #[source]
        source: hyper::Error,
    },
    /// An endpoint path could not be assembled.
    #[error("invalid host endpoint")]
    Endpoint {
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// The host answered a control request with a non-success status.
    #[error("host returned unexpected status")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// Returned status.
        status: u16,
    },
    /// Reading a response body failed.
    #[error("failed to read host response")]
    Body {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A response body was not the expected JSON document.
    #[error("failed to decode host response")]
    Decode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
