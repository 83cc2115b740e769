use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "env.json";
const APP_DIR: &str = "primboard-ingest";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("config field `{0}` must not be empty")]
    Empty(&'static str),
    #[error("config field `{field}` is not a valid address: {value}")]
    InvalidAddress { field: &'static str, value: String },
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFormat {
    #[default]
    Text,
    Json,
}

/// Static environment of a run, read once from the JSON env file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub ipfs_gateway: String,
    pub ipfs_node_api: String,
    pub primboard_host: String,
    #[serde(default)]
    pub logging_format: LoggingFormat,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ipfs_gateway.trim().is_empty() {
            return Err(ConfigError::Empty("ipfs_gateway"));
        }
        self.node_api_url()?;
        self.catalog_base_url()?;
        Ok(())
    }

    pub fn get_logging_format(&self) -> LoggingFormat {
        self.logging_format
    }

    /// Base URL of the IPFS node's HTTP API. A bare `host:port` is accepted.
    pub fn node_api_url(&self) -> Result<Url, ConfigError> {
        parse_address("ipfs_node_api", &self.ipfs_node_api)
    }

    /// Base URL of the catalog service. A bare `host:port` is accepted.
    pub fn catalog_base_url(&self) -> Result<Url, ConfigError> {
        parse_address("primboard_host", &self.primboard_host)
    }

    /// `host:port` used for the reachability check.
    pub fn catalog_socket_addr(&self) -> Result<String, ConfigError> {
        let url = self.catalog_base_url()?;
        let invalid = || ConfigError::InvalidAddress {
            field: "primboard_host",
            value: self.primboard_host.clone(),
        };
        let host = url.host_str().ok_or_else(invalid)?;
        let port = url.port_or_known_default().ok_or_else(invalid)?;
        Ok(format!("{}:{}", host, port))
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty(field));
    }

    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{}", value)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some() => Ok(url),
        _ => Err(ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        }),
    }
}

/// Resolves which env file to load: the explicit argument, `CONFIG_FILE`,
/// `env.json` in the working directory, then the XDG and home config dirs.
/// Falls back to `env.json` so a missing file surfaces as a read error.
pub fn get_config_path(explicit: Option<&Path>) -> PathBuf {
    resolve_config_path(explicit, Path::new(""))
}

fn resolve_config_path(explicit: Option<&Path>, working_dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("CONFIG_FILE") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    let local = working_dir.join(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = Path::new(&xdg_config_home)
            .join(APP_DIR)
            .join(DEFAULT_CONFIG_FILE);
        if config_path.exists() {
            return config_path;
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = home
            .join(".config")
            .join(APP_DIR)
            .join(DEFAULT_CONFIG_FILE);
        if config_path.exists() {
            return config_path;
        }
    }

    local
}
