//! # Application State
//!
//! Shared state for the Axum application, passed to the route dispatcher
//! via the `State` extractor.
//!
//! AppState holds the process configuration, the user store behind a trait
//! object (in-memory or Postgres), and the route registry built once at
//! startup.

use std::sync::Arc;

use userhub_core::{InMemoryUserStore, UserStore};

use crate::routes::{self, PatternError, RouteRegistry};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Application configuration.
///
/// Custom `Debug` redacts the auth token and the database URL, which may
/// carry a password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Postgres connection string. If `None`, users live in memory.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Build configuration from `PORT`, `AUTH_TOKEN`, `DATABASE_URL` and
    /// `LOG_FORMAT`. Unset or unparsable values fall back to defaults;
    /// empty strings count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            port: non_empty("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            auth_token: non_empty("AUTH_TOKEN"),
            database_url: non_empty("DATABASE_URL"),
            log_format: non_empty("LOG_FORMAT")
                .and_then(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn UserStore>,
    pub registry: Arc<RouteRegistry>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("routes", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state over the given store, building the route registry.
    pub fn try_new(config: AppConfig, store: Arc<dyn UserStore>) -> Result<Self, PatternError> {
        Ok(Self {
            config,
            store,
            registry: Arc::new(routes::registry()?),
        })
    }

    /// Create state backed by a fresh in-memory store.
    pub fn in_memory(config: AppConfig) -> Result<Self, PatternError> {
        Self::try_new(config, Arc::new(InMemoryUserStore::new()))
    }
}
