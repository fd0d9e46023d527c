//! TOML configuration for the `gallery` binary.
//!
//! ```toml
//! [service]
//! backend = "rest"            # or "memory"
//! url = "https://xyz.supabase.co"
//! api_key = "..."             # or GALLERY_API_KEY
//! timeout_secs = 15
//! max_retries = 2
//!
//! [media]
//! base_url = "https://media.example.com/"
//!
//! [gallery]
//! page_size = 30
//!
//! [identity]
//! user_id = "..."             # or GALLERY_USER_ID / --user
//!
//! [logging]
//! level = "info"              # GALLERY_LOG wins
//! ```
//!
//! Every section is optional; [`load_config`] validates the combination.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use photo_gallery_core::loader::DEFAULT_PAGE_SIZE;

pub const API_KEY_ENV: &str = "GALLERY_API_KEY";
pub const USER_ID_ENV: &str = "GALLERY_USER_ID";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Rest,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// JSON catalog loaded by the `memory` backend.
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Rest,
            url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            fixture: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MediaConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GalleryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IdentityConfig {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Configuration for commands that run without a config file: an empty
    /// in-memory backend and default settings.
    pub fn minimal() -> Self {
        Self {
            service: ServiceConfig {
                backend: Backend::Memory,
                ..ServiceConfig::default()
            },
            ..Self::default()
        }
    }

    /// API key from `GALLERY_API_KEY`, falling back to `[service].api_key`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.service.api_key.clone())
    }

    /// Resolve the acting user: `--user`, then `GALLERY_USER_ID`, then
    /// `[identity].user_id`.
    pub fn user_id(&self, cli_user: Option<&str>) -> Option<String> {
        cli_user
            .map(str::to_string)
            .or_else(|| std::env::var(USER_ID_ENV).ok())
            .or_else(|| self.identity.user_id.clone())
            .filter(|u| !u.is_empty())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.gallery.page_size == 0 {
        anyhow::bail!("gallery.page_size must be > 0");
    }

    if config.service.timeout_secs == 0 {
        anyhow::bail!("service.timeout_secs must be > 0");
    }

    match config.service.backend {
        Backend::Rest => {
            let url = config
                .service
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("service.url must be set for the rest backend"))?;
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("service.url must start with http:// or https://, got '{}'", url);
            }
        }
        Backend::Memory => {
            // Fixture paths are relative to the config file.
            if let Some(fixture) = config.service.fixture.take() {
                let resolved = match path.parent() {
                    Some(dir) if fixture.is_relative() => dir.join(fixture),
                    _ => fixture,
                };
                config.service.fixture = Some(resolved);
            }
        }
    }

    Ok(config)
}
