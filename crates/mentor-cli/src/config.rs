//! Configuration file management for mentor.
//!
//! Provides a TOML-based config file at `~/.config/mentor/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use mentor_core::cache::MemoryPlanCache;
use mentor_core::llm::GeminiConfig;
use mentor_core::pipeline::PipelineConfig;
use mentor_core::token::TokenConfig;
use mentor_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded token secret (64 hex chars = 32 bytes).
    pub token_secret: String,
}

/// Gemini settings. Every key is optional; unset keys fall back to the
/// client defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    PipelineConfig::DEFAULT_CACHE_TTL.as_secs()
}

fn default_max_entries() -> u64 {
    MemoryPlanCache::DEFAULT_MAX_ENTRIES
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the mentor config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/mentor` or `~/.config/mentor`,
/// on macOS too.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("mentor");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mentor")
}

/// Return the path to the mentor config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix, since the file holds secrets.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Token secret generation
// -----------------------------------------------------------------------

/// Generate a random token secret: 32 random bytes, hex-encoded (64 chars).
pub fn generate_token_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct MentorConfig {
    pub db_config: DbConfig,
    pub token_config: TokenConfig,
    pub gemini: GeminiConfig,
    pub pipeline: PipelineConfig,
    pub cache_max_entries: u64,
}

impl MentorConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `MENTOR_DATABASE_URL` > `[database].url` > `DbConfig::DEFAULT_URL`
    /// - Token secret: `MENTOR_TOKEN_SECRET` > `[auth].token_secret` (hex-decoded) > error
    /// - Gemini key: `MENTOR_GEMINI_API_KEY` > `[ai].api_key` > unset (calls fail)
    /// - Gemini model: `MENTOR_GEMINI_MODEL` > `[ai].model` > `GeminiConfig::DEFAULT_MODEL`
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("MENTOR_DATABASE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let mut db_config = DbConfig::new(db_url);
        if let Some(max) = file_config.as_ref().and_then(|c| c.database.max_connections) {
            db_config = db_config.with_max_connections(max);
        }

        let token_config = if let Ok(secret_hex) = std::env::var("MENTOR_TOKEN_SECRET") {
            TokenConfig::from_hex(&secret_hex)
                .context("MENTOR_TOKEN_SECRET env var is not a valid hex secret")?
        } else if let Some(ref cfg) = file_config {
            TokenConfig::from_hex(&cfg.auth.token_secret)
                .context("invalid hex in config file token_secret")?
        } else {
            bail!(
                "token secret not found; set MENTOR_TOKEN_SECRET or run `mentor init` to create a config file"
            );
        };

        let ai = file_config.as_ref().map(|c| &c.ai);
        let cache = file_config
            .as_ref()
            .map(|c| (c.cache.ttl_secs, c.cache.max_entries))
            .unwrap_or_else(|| (default_ttl_secs(), default_max_entries()));

        let api_key = non_empty_env("MENTOR_GEMINI_API_KEY")
            .or_else(|| ai.and_then(|a| a.api_key.clone()));
        let model = non_empty_env("MENTOR_GEMINI_MODEL")
            .or_else(|| ai.and_then(|a| a.model.clone()))
            .unwrap_or_else(|| GeminiConfig::DEFAULT_MODEL.to_string());
        let base_url = ai
            .and_then(|a| a.base_url.clone())
            .unwrap_or_else(|| GeminiConfig::DEFAULT_BASE_URL.to_string());
        let timeout = ai
            .and_then(|a| a.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(GeminiConfig::DEFAULT_TIMEOUT);

        let gemini = GeminiConfig {
            api_key,
            model,
            base_url,
            timeout,
            ..GeminiConfig::default()
        };

        let pipeline = PipelineConfig {
            max_output_tokens: ai
                .and_then(|a| a.max_output_tokens)
                .unwrap_or(PipelineConfig::DEFAULT_MAX_OUTPUT_TOKENS),
            temperature: ai
                .and_then(|a| a.temperature)
                .unwrap_or(PipelineConfig::DEFAULT_TEMPERATURE),
            cache_ttl: Duration::from_secs(cache.0),
            ..PipelineConfig::default()
        };

        Ok(Self {
            db_config,
            token_config,
            gemini,
            pipeline,
            cache_max_entries: cache.1,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
