//! Configuration path resolution and YAML parsing.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{AgentConfig, ConfigFile};

/// Pick the configuration file: explicit flag, then `CONFIG_PATH`, then
/// `config.yaml` in the working directory.
///
/// # Errors
///
/// Returns [`ConfigError::CurrentDir`] when the fallback needs the working
/// directory and it cannot be resolved.
pub fn resolve_config_path(flag: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|source| ConfigError::CurrentDir { source })?;
    Ok(resolve_with(None, env::var(CONFIG_PATH_ENV).ok(), &cwd))
}

fn resolve_with(flag: Option<&Path>, env_value: Option<String>, cwd: &Path) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| {
            env_value
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE))
}

/// Read and validate the configuration stored at `path`.
///
/// # Errors
///
/// Returns an error when the file cannot be read, is not valid YAML, or fails
/// validation.
pub fn load_config(path: &Path) -> ConfigResult<AgentConfig> {
    debug!(path = %path.display(), "loading configuration");
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text, path)
}

/// Parse and validate a YAML document. `origin` is only used for error context.
///
/// # Errors
///
/// Returns an error when the document does not match the schema or fails
/// validation.
pub fn parse_config(text: &str, origin: &Path) -> ConfigResult<AgentConfig> {
    let file: ConfigFile = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    AgentConfig::from_file(file)
}
