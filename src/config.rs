use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::avatar::AvatarMode;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Upper bound for a whole multipart request, text fields included
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    #[serde(default)]
    pub mode: AvatarMode,
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ValidationConfig {
    #[serde(default)]
    pub require_company: bool,
}

/// Where the server-rendered pages get student data from
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiConfig {
    /// Remote API root such as `http://localhost:3000/api`; unset means the
    /// pages call the local store directly
    #[serde(default)]
    pub base_url: Option<String>,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_db_path() -> String {
    "data/students.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_max_body_bytes() -> usize {
    6 * 1024 * 1024
}

fn default_provider_url() -> String {
    "https://api.dicebear.com/7.x/personas/svg".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            mode: AvatarMode::default(),
            provider_url: default_provider_url(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        tracing::info!(
            "Avatar config: mode={:?}, provider_url={}",
            config.avatar.mode,
            config.avatar.provider_url
        );
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: SC_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(val) = lookup("SC_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("SC_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("SC_CONF_SERVER_STATIC_DIR") {
            self.server.static_dir = val;
        }

        // Database overrides
        if let Some(val) = lookup("SC_CONF_DATABASE_PATH") {
            self.database.path = val;
        }
        if let Some(val) = lookup("SC_CONF_DATABASE_MAX_CONNECTIONS") {
            if let Ok(n) = val.parse() {
                self.database.max_connections = n;
            }
        }

        // Upload overrides
        if let Some(val) = lookup("SC_CONF_UPLOAD_MAX_BODY_BYTES") {
            if let Ok(n) = val.parse() {
                self.upload.max_body_bytes = n;
            }
        }

        // Avatar overrides
        if let Some(val) = lookup("SC_CONF_AVATAR_MODE") {
            match val.parse() {
                Ok(mode) => self.avatar.mode = mode,
                Err(e) => tracing::warn!("Ignoring SC_CONF_AVATAR_MODE: {}", e),
            }
        }
        if let Some(val) = lookup("SC_CONF_AVATAR_PROVIDER_URL") {
            if !val.trim().is_empty() {
                self.avatar.provider_url = val;
            }
        }

        // Validation overrides
        if let Some(val) = lookup("SC_CONF_VALIDATION_REQUIRE_COMPANY") {
            if let Ok(v) = val.parse() {
                self.validation.require_company = v;
            }
        }

        // API overrides; an empty value switches back to the local store
        if let Some(val) = lookup("SC_CONF_API_BASE_URL") {
            let val = val.trim();
            self.api.base_url = (!val.is_empty()).then(|| val.to_string());
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
