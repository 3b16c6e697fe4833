//! Field validation helpers used while building [`crate::AgentConfig`].

use std::net::IpAddr;
use std::path::PathBuf;

use crate::defaults::{MAX_PART_SIZE_MB, MIN_PART_SIZE_MB};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{PortValue, TlsFiles};

const MIB: u64 = 1024 * 1024;

pub(crate) fn require(
    section: &'static str,
    field: &'static str,
    value: String,
) -> ConfigResult<String> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { section, field });
    }
    Ok(value)
}

pub(crate) fn parse_port(value: Option<&PortValue>) -> ConfigResult<u16> {
    let invalid = |value: String, reason| ConfigError::InvalidField {
        section: "https",
        field: "port",
        value: Some(value),
        reason,
    };
    let raw = match value {
        None => {
            return Err(ConfigError::MissingField {
                section: "https",
                field: "port",
            });
        }
        Some(PortValue::Number(number)) => *number,
        Some(PortValue::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(text.clone(), "not_a_number"))?,
    };
    match u16::try_from(raw) {
        Ok(0) | Err(_) => Err(invalid(raw.to_string(), "out_of_range")),
        Ok(port) => Ok(port),
    }
}

pub(crate) fn parse_bind_addr(value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ConfigError::InvalidField {
            section: "https",
            field: "bindAddr",
            value: Some(value.to_string()),
            reason: "not_an_ip_address",
        })
}

/// Pair the certificate chain and key files. Neither set means plain HTTP;
/// one without the other is refused.
pub(crate) fn tls_files(
    cert_file: Option<String>,
    key_file: Option<String>,
) -> ConfigResult<Option<TlsFiles>> {
    let set = |value: Option<String>| value.filter(|path| !path.trim().is_empty());
    let missing = |field| ConfigError::InvalidField {
        section: "https",
        field,
        value: None,
        reason: "tls_pair_incomplete",
    };
    match (set(cert_file), set(key_file)) {
        (None, None) => Ok(None),
        (Some(cert_file), Some(key_file)) => Ok(Some(TlsFiles {
            cert_file: PathBuf::from(cert_file),
            key_file: PathBuf::from(key_file),
        })),
        (Some(_), None) => Err(missing("tlsKeyFile")),
        (None, Some(_)) => Err(missing("tlsCertFile")),
    }
}

pub(crate) fn part_size_bytes(megabytes: u64) -> ConfigResult<usize> {
    if !(MIN_PART_SIZE_MB..=MAX_PART_SIZE_MB).contains(&megabytes) {
        return Err(ConfigError::InvalidField {
            section: "s3",
            field: "partSizeMB",
            value: Some(megabytes.to_string()),
            reason: "outside_multipart_bounds",
        });
    }
    usize::try_from(megabytes * MIB).map_err(|_| ConfigError::InvalidField {
        section: "s3",
        field: "partSizeMB",
        value: Some(megabytes.to_string()),
        reason: "exceeds_address_space",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_accepts_numbers_and_strings() -> ConfigResult<()> {
        assert_eq!(parse_port(Some(&PortValue::Number(8443)))?, 8443);
        assert_eq!(parse_port(Some(&PortValue::Text(" 9000 ".into())))?, 9000);
        Ok(())
    }

    #[test]
    fn parse_port_rejects_missing_and_out_of_range() {
        assert!(matches!(
            parse_port(None),
            Err(ConfigError::MissingField { field: "port", .. })
        ));
        assert!(matches!(
            parse_port(Some(&PortValue::Number(0))),
            Err(ConfigError::InvalidField {
                reason: "out_of_range",
                ..
            })
        ));
        assert!(matches!(
            parse_port(Some(&PortValue::Number(70_000))),
            Err(ConfigError::InvalidField {
                reason: "out_of_range",
                ..
            })
        ));
        assert!(matches!(
            parse_port(Some(&PortValue::Text("https".into()))),
            Err(ConfigError::InvalidField {
                reason: "not_a_number",
                ..
            })
        ));
    }

    #[test]
    fn part_size_enforces_multipart_bounds() -> ConfigResult<()> {
        assert_eq!(part_size_bytes(5)?, 5 * 1024 * 1024);
        assert!(part_size_bytes(4).is_err());
        assert!(part_size_bytes(MAX_PART_SIZE_MB + 1).is_err());
        Ok(())
    }

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("s3", "bucket", "  ".to_string()).is_err());
        assert!(require("s3", "bucket", "backups".to_string()).is_ok());
    }

    #[test]
    fn tls_files_come_in_pairs() -> ConfigResult<()> {
        assert_eq!(tls_files(None, Some(" ".to_string()))?, None);
        let pair = tls_files(
            Some("/etc/snapferry/cert.pem".to_string()),
            Some("/etc/snapferry/key.pem".to_string()),
        )?;
        assert_eq!(
            pair.map(|files| files.key_file),
            Some(PathBuf::from("/etc/snapferry/key.pem"))
        );
        assert!(matches!(
            tls_files(Some("/etc/snapferry/cert.pem".to_string()), None),
            Err(ConfigError::InvalidField {
                field: "tlsKeyFile",
                reason: "tls_pair_incomplete",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn bind_addr_must_be_ip() {
        assert!(parse_bind_addr("127.0.0.1").is_ok());
        assert!(parse_bind_addr("::").is_ok());
        assert!(parse_bind_addr("localhost").is_err());
    }
}
