//! Console Configuration Module
//!
//! Config is stored in `~/.config/rbac-console/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (`--api-url`, `--token`, `--page-size`)
//! 2. Environment variables (`RBAC_API_URL`, `RBAC_TOKEN`, `RBAC_IDENTITY`, `RBAC_PAGE_SIZE`)
//! 3. Config file
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub ui: UiSettings,

    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSettings {
    /// Base url, the `/api/rbac/...` paths are appended
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Bearer token
    pub token: Option<String>,

    /// Base64 `x-rh-identity` header for direct-to-service access
    pub identity: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            token: None,
            identity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub page_size: Option<usize>,
}

impl ConsoleConfig {
    /// Returns `~/.config/rbac-console/` on Unix, `%APPDATA%/rbac-console/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rbac-console")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// TUI mode writes its log here instead of the terminal
    pub fn log_path() -> PathBuf {
        Self::config_dir().join("rbac-console.log")
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Returns defaults if the file doesn't exist, an error if it is malformed
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| RbacError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| RbacError::Config {
            reason: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Environment variables take precedence over config file values
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| var(name).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("RBAC_API_URL") {
            self.api.url = url;
        }
        if let Some(token) = non_empty("RBAC_TOKEN") {
            self.api.token = Some(token);
        }
        if let Some(identity) = non_empty("RBAC_IDENTITY") {
            self.api.identity = Some(identity);
        }
        if let Some(size) = non_empty("RBAC_PAGE_SIZE") {
            self.ui.page_size = size.parse().map_err(|_| RbacError::Config {
                reason: format!("RBAC_PAGE_SIZE must be a number, got '{}'", size),
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(url) = &overrides.api_url {
            self.api.url = url.clone();
        }
        if let Some(token) = &overrides.token {
            self.api.token = Some(token.clone());
        }
        if let Some(size) = overrides.page_size {
            self.ui.page_size = size;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ui.page_size == 0 || self.ui.page_size > MAX_PAGE_SIZE {
            return Err(RbacError::Config {
                reason: format!(
                    "page_size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, self.ui.page_size
                ),
            });
        }
        url::Url::parse(&self.api.url)?;
        Ok(())
    }
}

/// Mask a token for display, e.g. "eyJhbGci***"
pub fn mask_token(token: &str, visible_chars: usize) -> String {
    if token.is_empty() {
        return String::new();
    }
    let visible: String = token.chars().take(visible_chars).collect();
    format!("{}***", visible)
}
