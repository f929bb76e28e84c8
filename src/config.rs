use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the `xh` binary used for requests.
pub const XH_BIN_ENV: &str = "EXPECTQ_XH_BIN";

/// Environment variable holding the tracing filter for the CLI.
pub const LOG_ENV: &str = "EXPECTQ_LOG";

/// Session configuration loaded from `expectq.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prefix joined to relative request URLs.
    pub base_url: Option<String>,
    /// Headers merged into every request after the JSON content type.
    pub headers: BTreeMap<String, String>,
    pub proxy: Option<String>,
    pub follow_redirects: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: BTreeMap::new(),
            proxy: None,
            follow_redirects: true,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// Joins `url` to `base_url` unless it is already absolute.
    pub fn resolve_url(&self, url: &str) -> String {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }
}
