pub mod api;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod runner;
pub mod template;
pub mod utils;
pub mod webhook;

use axum::{Router, routing};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::{DispatchError, Result};
use crate::runner::CommandRunner;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
pub const MAX_PAYLOAD_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Server configuration, read once at startup.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Configuration {
    /// Address to listen on, `host:port` or Go-style `:port`.
    #[serde(default)]
    pub listen: String,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Repositories to respond to. Pushes to anything else are rejected.
    #[serde(default)]
    pub repositories: Vec<RepositoryRule>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityConfig {
    /// Serve the webhook at `/<custom_path>`.
    #[serde(default)]
    pub custom_path: String,
    /// HMAC secret. Empty disables signature checking.
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryRule {
    /// Full repository name, e.g. `owner/repo`.
    pub repository: String,
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// A command to run for a repository.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct CommandSpec {
    pub command: String,
    /// Argument templates, rendered against the push event.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory; empty inherits the server's.
    #[serde(default)]
    pub cwd: String,
}

impl Configuration {
    /// Load and parse a configuration file. `.toml` files are read as TOML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).map_err(|e| {
            DispatchError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            Self::from_toml_str(&config_str)
        } else {
            Self::from_json_str(&config_str)
        };

        parsed.map_err(|e| {
            DispatchError::ConfigError(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| DispatchError::ConfigError(e.to_string()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DispatchError::ConfigError(e.to_string()))
    }

    /// Socket address to bind. `:8080` binds every interface.
    pub fn bind_address(&self) -> String {
        match self.listen.trim() {
            "" => DEFAULT_BIND_ADDRESS.to_string(),
            listen if listen.starts_with(':') => format!("0.0.0.0{}", listen),
            listen => listen.to_string(),
        }
    }

    /// Route the webhook is served on.
    pub fn webhook_route(&self) -> String {
        format!("/{}", self.security.custom_path.trim_start_matches('/'))
    }

    pub fn signature_required(&self) -> bool {
        !self.security.secret.is_empty()
    }

    /// Logs settings that are legal but probably unintended.
    pub fn warn_about_suspicious_settings(&self) {
        if !self.signature_required() {
            warn!("No webhook secret configured; signature verification is disabled");
        }

        let mut seen = HashSet::new();
        for rule in &self.repositories {
            if !seen.insert(rule.repository.as_str()) {
                warn!(
                    "Repository '{}' is listed more than once; only the first entry is used",
                    rule.repository
                );
            }
        }
    }
}

pub struct AppState {
    pub config: Configuration,
    pub runner: Arc<dyn CommandRunner>,
    pub max_payload_size: usize,
}

impl AppState {
    pub fn new(config: Configuration, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Builds the router serving the webhook endpoint.
pub fn app(state: SharedState) -> Router {
    let route = state.config.webhook_route();
    Router::new()
        .route(&route, routing::any(api::handle_webhook))
        .with_state(state)
}
