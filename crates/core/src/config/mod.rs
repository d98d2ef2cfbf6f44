//! Worker configuration with layered loading.
//!
//! Configuration is loaded with figment from, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Environment variables (SWCACHE_*)
//!
//! The generation name and the asset list are the only knobs that change
//! what gets cached; bumping the generation invalidates every older one.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::manifest::{AssetManifest, CacheGeneration};

mod validation;

pub use validation::ConfigError;

/// Order in which the store and the network are consulted on fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from the store, fall back to the network, then to a 503.
    #[default]
    CacheFirst,
    /// Ask the network, fall back to whatever the store holds.
    NetworkFirst,
}

/// Which [`BlobStore`](crate::BlobStore) backend a host opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache generation.
    ///
    /// Set via SWCACHE_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Origin the worker serves; relative assets resolve against it and
    /// responses from it count as same-origin.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Assets pre-cached on install, in order.
    ///
    /// Set via SWCACHE_ASSETS environment variable (`[a, b, ...]`).
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Fetch strategy.
    ///
    /// Set via SWCACHE_STRATEGY environment variable.
    #[serde(default)]
    pub strategy: Strategy,

    /// Store backend.
    ///
    /// Set via SWCACHE_STORE environment variable.
    #[serde(default)]
    pub store: StoreBackend,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum body bytes accepted from the network per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds. Unset means requests may hang.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_generation() -> String {
    "github-pages-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8000/".into()
}

fn default_assets() -> Vec<String> {
    [
        "/github_pages_index/",
        "/github_pages_index/index.html",
        "/github_pages_index/css/styles.css",
        "/github_pages_index/images/logo.svg",
        "/github_pages_index/images/favicon.svg",
        "/github_pages_index/images/apple-touch-icon.png",
        "/github_pages_index/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            origin: default_origin(),
            assets: default_assets(),
            strategy: Strategy::default(),
            store: StoreBackend::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file or environment cannot be
    /// parsed, or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed origin.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Validated generation name.
    pub fn cache_generation(&self) -> Result<CacheGeneration, ConfigError> {
        CacheGeneration::new(self.generation.clone())
            .map_err(|e| ConfigError::Invalid { field: "generation".into(), reason: e.to_string() })
    }

    /// Asset list resolved against the origin.
    pub fn manifest(&self) -> Result<AssetManifest, ConfigError> {
        let origin = self.origin_url()?;
        AssetManifest::resolve(&origin, &self.assets)
            .map_err(|e| ConfigError::Invalid { field: "assets".into(), reason: e.to_string() })
    }
}
