//! Settings resolution.
//!
//! Precedence, highest first: the dedicated `.env`-style config file, values
//! typed into the UI, then built-in defaults. The file is parsed with
//! `dotenvy` without touching the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_TEMPERATURE: &str = "OPENAI_TEMPERATURE";
pub const ENV_PROVIDER: &str = "RENDERMIND_PROVIDER";
pub const ENV_ENDPOINT: &str = "RENDERMIND_ENDPOINT";
pub const ENV_ASSETS: &str = "RENDERMIND_ASSETS";
pub const ENV_TIMEOUT_SECS: &str = "RENDERMIND_TIMEOUT_SECS";
pub const ENV_AUTO_EXECUTE: &str = "RENDERMIND_AUTO_EXECUTE";

/// Display name users pick; mapped to [`DEFAULT_REMOTE_MODEL`] on the wire.
pub const DEFAULT_MODEL: &str = "rendermind-v1";
pub const DEFAULT_REMOTE_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ASSET_ROOT: &str = "assets";
pub const DEFAULT_REMOTE_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://127.0.0.1:8000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Which generation backend serves instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Hosted chat-completion API.
    #[default]
    Remote,
    /// Locally served adapter-tuned model.
    LocalAdapter,
    /// Canned scripts, no network.
    Demo,
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "openai" => Ok(Provider::Remote),
            "local" | "local_adapter" | "adapter" => Ok(Provider::LocalAdapter),
            "demo" => Ok(Provider::Demo),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Remote => write!(f, "remote"),
            Provider::LocalAdapter => write!(f, "local_adapter"),
            Provider::Demo => write!(f, "demo"),
        }
    }
}

/// Values entered in the UI. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub provider: Option<Provider>,
    pub endpoint: String,
    pub asset_root: String,
    pub auto_execute: Option<bool>,
}

/// Fully resolved settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub provider: Provider,
    pub api_key: Option<String>,
    /// Model name as shown to the user.
    pub model: String,
    pub temperature: f64,
    pub timeout: Duration,
    pub endpoint: String,
    pub asset_root: PathBuf,
    pub auto_execute: bool,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .field("asset_root", &self.asset_root)
            .field("auto_execute", &self.auto_execute)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_layers(&HashMap::new(), &UiSettings::default())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `.env`-style file into a key/value map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let read_err = |source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    };
    let iter = dotenvy::from_path_iter(path).map_err(read_err)?;
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(read_err)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

impl Settings {
    /// Resolve settings from an optional config file and the UI layer.
    ///
    /// A missing file is treated as an empty layer.
    pub fn resolve(env_file: Option<&Path>, ui: &UiSettings) -> Result<Self, ConfigError> {
        let file = match env_file {
            Some(path) if path.is_file() => read_env_file(path)?,
            Some(path) => {
                debug!(path = %path.display(), "config file not found, skipping");
                HashMap::new()
            }
            None => HashMap::new(),
        };
        Ok(Self::from_layers(&file, ui))
    }

    /// Merge layers. Unparsable file values fall through to the next layer.
    pub fn from_layers(file: &HashMap<String, String>, ui: &UiSettings) -> Self {
        let file_str = |key: &str| file.get(key).and_then(|v| non_empty(v));

        let provider = file_str(ENV_PROVIDER)
            .and_then(|v| v.parse().ok())
            .or(ui.provider)
            .unwrap_or_default();

        let api_key = file_str(ENV_API_KEY).or_else(|| non_empty(&ui.api_key));

        let model = file_str(ENV_MODEL)
            .or_else(|| non_empty(&ui.model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let temperature = file_str(ENV_TEMPERATURE)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|t| t.is_finite())
            .or(ui.temperature.filter(|t| t.is_finite()))
            .unwrap_or(DEFAULT_TEMPERATURE)
            .clamp(0.0, 2.0);

        let timeout = file_str(ENV_TIMEOUT_SECS)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let endpoint = file_str(ENV_ENDPOINT)
            .or_else(|| non_empty(&ui.endpoint))
            .unwrap_or_else(|| match provider {
                Provider::LocalAdapter => DEFAULT_LOCAL_ENDPOINT.to_string(),
                _ => DEFAULT_REMOTE_ENDPOINT.to_string(),
            });

        let asset_root = file_str(ENV_ASSETS)
            .or_else(|| non_empty(&ui.asset_root))
            .unwrap_or_else(|| DEFAULT_ASSET_ROOT.to_string());

        let auto_execute = file_str(ENV_AUTO_EXECUTE)
            .and_then(|v| parse_bool(&v))
            .or(ui.auto_execute)
            .unwrap_or(true);

        Self {
            provider,
            api_key,
            model,
            temperature,
            timeout: Duration::from_secs(timeout),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            asset_root: PathBuf::from(asset_root),
            auto_execute,
        }
    }

    /// Concrete model name sent to the remote API.
    pub fn remote_model(&self) -> &str {
        if self.model == DEFAULT_MODEL {
            DEFAULT_REMOTE_MODEL
        } else {
            &self.model
        }
    }
}
