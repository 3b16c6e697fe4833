//! Configuration file schema and the validated settings handed to collaborators.

use std::fmt::{self, Debug, Formatter};
use std::net::IpAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::defaults::{DEFAULT_BIND_ADDR, DEFAULT_LOG_LEVEL, DEFAULT_PART_SIZE_MB};
use crate::error::ConfigResult;
use crate::validate::{parse_bind_addr, parse_port, part_size_bytes, require, tls_files};

/// String value that never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw value to the code that must send it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("Secret(***)")
    }
}

/// On-disk document layout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigFile {
    pub(crate) s3: S3Section,
    pub(crate) https: HttpsSection,
    #[serde(default)]
    pub(crate) lxd_socket: String,
    #[serde(default)]
    pub(crate) logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct S3Section {
    #[serde(default)]
    pub(crate) key: String,
    #[serde(default = "empty_secret")]
    pub(crate) secret: Secret,
    #[serde(default)]
    pub(crate) region: String,
    #[serde(default)]
    pub(crate) endpoint: String,
    #[serde(default)]
    pub(crate) bucket: String,
    #[serde(default, rename = "partSizeMB")]
    pub(crate) part_size_mb: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PortValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HttpsSection {
    pub(crate) port: Option<PortValue>,
    #[serde(default)]
    pub(crate) bind_addr: Option<String>,
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default = "empty_secret")]
    pub(crate) password: Secret,
    #[serde(default)]
    pub(crate) tls_cert_file: Option<String>,
    #[serde(default)]
    pub(crate) tls_key_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoggingSection {
    pub(crate) level: Option<String>,
    pub(crate) format: Option<String>,
}

fn empty_secret() -> Secret {
    Secret::new(String::new())
}

/// Object store connection settings, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// S3-compatible endpoint URL.
    pub endpoint: String,
    /// Signing region.
    pub region: String,
    /// Target bucket.
    pub bucket: String,
    /// Static access key identifier.
    pub access_key: String,
    /// Static secret access key.
    pub secret_key: Secret,
    /// Multipart part size in bytes.
    pub part_size: usize,
}

/// HTTP listener and caller credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address to bind.
    pub bind_addr: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Basic auth user name.
    pub username: String,
    /// Basic auth password.
    pub password: Secret,
    /// Certificate and key for HTTPS; `None` serves plain HTTP.
    pub tls: Option<TlsFiles>,
}

/// PEM files the listener terminates TLS with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    /// Certificate chain, leaf first.
    pub cert_file: PathBuf,
    /// Private key for the leaf certificate.
    pub key_file: PathBuf,
}

/// Virtualization host connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Path of the host API unix socket.
    pub socket_path: PathBuf,
}

/// Logging preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Level directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Requested output format (`json` or `pretty`), inferred when absent.
    pub format: Option<String>,
}

/// Validated agent configuration. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Object store settings.
    pub store: StoreSettings,
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Host connection settings.
    pub host: HostSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl AgentConfig {
    pub(crate) fn from_file(file: ConfigFile) -> ConfigResult<Self> {
        let ConfigFile {
            s3,
            https,
            lxd_socket,
            logging,
        } = file;

        let store = StoreSettings {
            endpoint: require("s3", "endpoint", s3.endpoint)?,
            region: require("s3", "region", s3.region)?,
            bucket: require("s3", "bucket", s3.bucket)?,
            access_key: require("s3", "key", s3.key)?,
            secret_key: Secret::new(require("s3", "secret", s3.secret.0)?),
            part_size: part_size_bytes(s3.part_size_mb.unwrap_or(DEFAULT_PART_SIZE_MB))?,
        };

        let server = ServerSettings {
            bind_addr: parse_bind_addr(https.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR))?,
            port: parse_port(https.port.as_ref())?,
            username: require("https", "username", https.username)?,
            password: Secret::new(require("https", "password", https.password.0)?),
            tls: tls_files(https.tls_cert_file, https.tls_key_file)?,
        };

        let host = HostSettings {
            socket_path: PathBuf::from(require("root", "lxdSocket", lxd_socket)?),
        };

        let logging = LoggingSettings {
            level: logging
                .level
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            format: logging.format,
        };

        Ok(Self {
            store,
            server,
            host,
            logging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }
}
