use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use snapferry_config::{ConfigError, load_config, parse_config};

const SAMPLE: &str = r"
s3:
  key: AKIAEXAMPLE
  secret: s3cr3t
  region: us-east-1
  endpoint: http://minio.local:9000
  bucket: lxd-backups
  partSizeMB: 8
https:
  port: '8443'
  username: operator
  password: hunter2
lxdSocket: /var/snap/lxd/common/lxd/unix.socket
";

#[test]
fn load_config_reads_original_agent_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(&path, SAMPLE)?;

    let config = load_config(&path)?;
    assert_eq!(config.store.bucket, "lxd-backups");
    assert_eq!(config.store.endpoint, "http://minio.local:9000");
    assert_eq!(config.store.secret_key.expose(), "s3cr3t");
    assert_eq!(config.store.part_size, 8 * 1024 * 1024);
    assert_eq!(config.server.port, 8443);
    assert_eq!(config.server.bind_addr, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.server.username, "operator");
    assert_eq!(
        config.host.socket_path,
        PathBuf::from("/var/snap/lxd/common/lxd/unix.socket")
    );
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.server.tls, None);
    assert!(!format!("{config:?}").contains("hunter2"));
    Ok(())
}

#[test]
fn tls_pair_enables_https() -> anyhow::Result<()> {
    let text = SAMPLE.replace(
        "  password: hunter2\n",
        "  password: hunter2\n  tlsCertFile: /etc/snapferry/cert.pem\n  tlsKeyFile: /etc/snapferry/key.pem\n",
    );
    let config = parse_config(&text, Path::new("inline.yaml"))?;
    let tls = config.server.tls.ok_or_else(|| anyhow::anyhow!("tls not enabled"))?;
    assert_eq!(tls.cert_file, PathBuf::from("/etc/snapferry/cert.pem"));
    assert_eq!(tls.key_file, PathBuf::from("/etc/snapferry/key.pem"));
    Ok(())
}

#[test]
fn certificate_without_key_is_refused() {
    let text = SAMPLE.replace(
        "  password: hunter2\n",
        "  password: hunter2\n  tlsCertFile: /etc/snapferry/cert.pem\n",
    );
    let err = parse_config(&text, Path::new("inline.yaml")).err();
    assert!(matches!(
        err,
        Some(ConfigError::InvalidField {
            section: "https",
            field: "tlsKeyFile",
            ..
        })
    ));
}

#[test]
fn part_size_defaults_when_omitted() -> anyhow::Result<()> {
    let text = SAMPLE.replace("  partSizeMB: 8\n", "");
    let config = parse_config(&text, Path::new("inline.yaml"))?;
    assert_eq!(config.store.part_size, 32 * 1024 * 1024);
    Ok(())
}

#[test]
fn missing_bucket_is_reported_by_name() {
    let text = SAMPLE.replace("  bucket: lxd-backups\n", "");
    match parse_config(&text, Path::new("inline.yaml")) {
        Err(ConfigError::MissingField { section, field }) => {
            assert_eq!(section, "s3");
            assert_eq!(field, "bucket");
        }
        other => panic!("expected missing bucket, got {other:?}"),
    }
}

#[test]
fn undersized_parts_are_rejected() {
    let text = SAMPLE.replace("partSizeMB: 8", "partSizeMB: 1");
    assert!(matches!(
        parse_config(&text, Path::new("inline.yaml")),
        Err(ConfigError::InvalidField {
            field: "partSizeMB",
            ..
        })
    ));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = load_config(Path::new("/definitely/missing/config.yaml")).err();
    assert!(matches!(err, Some(ConfigError::Read { .. })));
}
