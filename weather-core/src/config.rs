use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::provider::ProviderId;

/// Configuration for a single upstream provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the provider's public endpoint (mostly for tests and proxies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Browser origin allowed by CORS.
    pub cors_origin: String,
    /// Whether saved-location routes demand a bearer token for the same user.
    pub require_auth: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cors_origin: "http://localhost:5173".to_string(),
            require_auth: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `memory:` or `sqlite://<path>`.
    pub uri: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Top-level configuration: defaults, then the TOML file, then environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,

    /// Example TOML:
    /// [providers.mapbox]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Set/replace a provider API key, keeping any base URL override.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .or_default()
            .api_key = Some(api_key);
    }

    pub fn set_provider_base_url(&mut self, provider_id: ProviderId, base_url: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .or_default()
            .base_url = Some(base_url);
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).and_then(|cfg| cfg.api_key.as_deref())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    /// Signing secret, required before serving.
    pub fn jwt_secret(&self) -> Result<&str> {
        self.auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("No token signing secret configured.\nHint: set JWT_SECRET."))
    }

    /// Load the default config file, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default path, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-alerts", "weather-server")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; blank values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = get("CORS_ORIGIN") {
            self.server.cors_origin = v;
        }
        if let Some(v) = get("REQUIRE_AUTH") {
            self.server.require_auth = parse_bool("REQUIRE_AUTH", &v)?;
        }
        if let Some(v) = get("JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Some(v) = get("CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_var("CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = get("DATABASE_URI") {
            self.database.uri = v;
        }
        if let Some(v) = get("MAPBOX_TOKEN") {
            self.upsert_provider_api_key(ProviderId::Mapbox, v);
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value '{value}': {e}"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("Invalid {key} value '{value}': expected true or false"),
    }
}
