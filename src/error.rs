//! Error types with fix suggestions

use thiserror::Error;

use crate::model::EntityKind;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

pub type Result<T> = std::result::Result<T, RbacError>;

#[derive(Error, Debug)]
pub enum RbacError {
    /// Non-2xx response; `message` is the server's first error detail when present
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {reason}")]
    Config { reason: String },

    #[error("Invalid API url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Validation(String),

    #[error("{} '{id}' not found", .kind.label())]
    NotFound { kind: EntityKind, id: String },
}

impl RbacError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Build an API error from a raw response body.
    ///
    /// Bodies shaped like `{"errors":[{"detail":"..."}]}` surface the first
    /// detail verbatim, anything else falls back to a fixed message.
    pub fn from_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("errors")
                    .and_then(|e| e.get(0))
                    .and_then(|e| e.get("detail"))
                    .and_then(|d| d.as_str())
                    .map(str::to_string)
                    .or_else(|| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            });

        Self::api(
            status,
            detail.unwrap_or_else(|| format!("Request failed with status {}", status)),
        )
    }

    /// HTTP status, when the error came from the server
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl FixSuggestion for RbacError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            RbacError::Api { status: 401, .. } | RbacError::Api { status: 403, .. } => {
                Some("Check RBAC_TOKEN / RBAC_IDENTITY or the [api] section of config.toml")
            }
            RbacError::Api { .. } => None,
            RbacError::Network(_) => Some("Check the API is reachable (try `rbac check`)"),
            RbacError::Json(_) => Some("Check the payload is valid JSON (try parsing with jq)"),
            RbacError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            RbacError::Io(_) => Some("Check file path and permissions"),
            RbacError::Config { .. } => Some("Fix or remove ~/.config/rbac-console/config.toml"),
            RbacError::InvalidUrl(_) => Some("Use a full url such as http://localhost:8000"),
            RbacError::Validation(_) => None,
            RbacError::NotFound { .. } => Some("Verify the id exists (list it first)"),
        }
    }
}
