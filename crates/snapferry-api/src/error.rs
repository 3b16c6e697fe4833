//! Listener errors for the agent HTTP surface.
//!
//! Request-level failures never reach this type; handlers render them as
//! problem documents.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Result alias for API server operations.
pub type ApiServerResult<T> = std::result::Result<T, ApiServerError>;

/// Errors raised while binding or serving the API.
#[derive(Debug)]
pub enum ApiServerError {
    /// The configured listen address could not be bound.
    Bind {
        /// Address from the agent configuration.
        addr: SocketAddr,
        /// Socket error.
        source: io::Error,
    },
    /// The certificate chain or private key could not be loaded.
    Tls {
        /// Certificate chain file.
        cert_file: PathBuf,
        /// Private key file.
        key_file: PathBuf,
        /// Read or parse error.
        source: io::Error,
    },
    /// A pre-bound listener could not report its address.
    LocalAddr {
        /// Socket error.
        source: io::Error,
    },
    /// The accept loop stopped with an error.
    Serve {
        /// Socket error.
        source: io::Error,
    },
}

impl Display for ApiServerError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { addr, .. } => write!(formatter, "cannot listen on {addr}"),
            Self::Tls { cert_file, .. } => write!(
                formatter,
                "cannot load tls identity from {}",
                cert_file.display()
            ),
            Self::LocalAddr { .. } => formatter.write_str("listener has no local address"),
            Self::Serve { .. } => formatter.write_str("api listener stopped"),
        }
    }
}

impl Error for ApiServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bind { source, .. }
            | Self::Tls { source, .. }
            | Self::LocalAddr { source }
            | Self::Serve { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_failure_names_the_address() -> Result<(), Box<dyn Error>> {
        let err = ApiServerError::Bind {
            addr: "0.0.0.0:8080".parse()?,
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert_eq!(err.to_string(), "cannot listen on 0.0.0.0:8080");
        assert_eq!(
            err.source()
                .and_then(|source| source.downcast_ref::<io::Error>())
                .map(io::Error::kind),
            Some(io::ErrorKind::AddrInUse)
        );
        Ok(())
    }
}
