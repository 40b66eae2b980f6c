//! CLI configuration
//!
//! Settings resolve in precedence order: command-line flags, then
//! environment variables, then `~/.config/wsctl/config.toml`, then
//! built-in defaults. Every layer is a partial [`Config`]; higher layers
//! override only the fields they set.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wsctl_client::ApiConfig;

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "WSCTL_API_URL";

/// Environment variable overriding the bearer token.
pub const ENV_API_TOKEN: &str = "WSCTL_API_TOKEN";

/// One layer of CLI settings; missing fields fall through to the layer
/// below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the platform API
    pub api_url: Option<String>,

    /// Bearer token for the platform API
    pub api_token: Option<String>,

    /// Status poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Loads the config file layer.
    ///
    /// A missing file is not an error; it yields the empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or is not
    /// valid TOML.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads a config file from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Builds the environment layer from `WSCTL_API_URL` and
    /// `WSCTL_API_TOKEN`. Empty values count as unset.
    pub fn from_env() -> Self {
        Self {
            api_url: env_value(ENV_API_URL),
            api_token: env_value(ENV_API_TOKEN),
            poll_interval_ms: None,
        }
    }

    /// Overlays `over` on top of this layer; set fields in `over` win.
    #[must_use]
    pub fn merged(self, over: Self) -> Self {
        Self {
            api_url: over.api_url.or(self.api_url),
            api_token: over.api_token.or(self.api_token),
            poll_interval_ms: over.poll_interval_ms.or(self.poll_interval_ms),
        }
    }

    /// Produces connection settings, filling unset fields with the client
    /// defaults.
    pub fn api_config(&self) -> ApiConfig {
        let mut api = ApiConfig::default();
        if let Some(url) = &self.api_url {
            api.base_url = url.clone();
        }
        api.token = self.api_token.clone();
        api
    }
}

/// Returns the path of the config file, `~/.config/wsctl/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wsctl").join("config.toml"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
