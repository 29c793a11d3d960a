//! Configuration loading for ClassroomCogni services
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binaries on top of the result)
//! 2. Environment variables (a `.env` file in the working directory is loaded first)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is never fatal: the service logs a warning and keeps
//! going with environment values and defaults. Required credentials are checked
//! separately by [`ServiceConfig::validate`] so that tools needing only the
//! datastore (the seed binary) can run without LLM keys.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variable naming an explicit TOML config file
pub const CONFIG_PATH_ENV: &str = "COGNI_CONFIG";

/// Text-generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Vendor display name used in startup banners
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::OpenAi => "OpenAI",
        }
    }

    /// Name of the environment variable holding this provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(Error::Config(format!(
                "Invalid AI_PROVIDER '{}'. Must be 'gemini' or 'openai'",
                other
            ))),
        }
    }
}

/// TOML configuration file contents
///
/// Every field is optional; anything left out falls through to the
/// environment and then to compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_service_key: Option<String>,
    #[serde(default)]
    pub ai_provider: Option<String>,
    #[serde(default)]
    pub gemini: ProviderSection,
    #[serde(default)]
    pub openai: ProviderSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: PromptLimits,
}

/// `[gemini]` / `[openai]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// `[server]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

/// Size limits applied while building prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    /// Notes or message transcript longer than this many characters is truncated
    pub max_source_chars: usize,
    /// Most recent messages considered for confusion analysis
    pub max_messages: usize,
    /// Image uploads attached to a single prompt
    pub max_images: usize,
    /// Largest image download accepted
    pub max_image_bytes: usize,
    /// Generated text shorter than this is treated as a failed generation
    pub min_content_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_source_chars: 30_000,
            max_messages: 200,
            max_images: 4,
            max_image_bytes: 5 * 1024 * 1024,
            min_content_chars: 50,
        }
    }
}

/// Datastore (PostgREST) endpoint and credentials
#[derive(Debug, Clone, Default)]
pub struct DatastoreConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
}

/// Resolved settings for one LLM provider
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// HTTP server bind settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub datastore: DatastoreConfig,
    pub provider: ProviderKind,
    pub gemini: ModelConfig,
    pub openai: ModelConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub limits: PromptLimits,
}

impl ServiceConfig {
    /// Load configuration from `.env`, the process environment and an optional TOML file
    ///
    /// `explicit_path` (from `--config`) takes precedence over `COGNI_CONFIG`,
    /// which takes precedence over the per-user default location.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Failed to load .env file: {}", e),
        }

        let env = |key: &str| std::env::var(key).ok();
        let toml_config = match locate_config_file(explicit_path, &env) {
            Some(path) => load_toml_config(&path)?,
            None => TomlConfig::default(),
        };

        Self::resolve(&toml_config, env)
    }

    /// Merge TOML values with an environment lookup and compiled defaults
    ///
    /// Blank environment values are treated as unset.
    pub fn resolve<F>(toml_config: &TomlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let provider = match lookup("AI_PROVIDER").or_else(|| toml_config.ai_provider.clone()) {
            Some(name) => name.parse()?,
            None => ProviderKind::Gemini,
        };

        let port = match lookup("AI_SERVICE_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                Error::Config(format!("Invalid AI_SERVICE_PORT '{}': {}", raw, e))
            })?,
            None => toml_config.server.port.unwrap_or(DEFAULT_PORT),
        };

        let resolve_model = |section: &ProviderSection, prefix: &str, model: &str, base: &str| {
            ModelConfig {
                api_key: lookup(&format!("{}_API_KEY", prefix)).or_else(|| section.api_key.clone()),
                model: lookup(&format!("{}_MODEL", prefix))
                    .or_else(|| section.model.clone())
                    .unwrap_or_else(|| model.to_string()),
                base_url: lookup(&format!("{}_BASE_URL", prefix))
                    .or_else(|| section.base_url.clone())
                    .unwrap_or_else(|| base.to_string()),
            }
        };

        let mut logging = toml_config.logging.clone();
        if let Some(level) = lookup("COGNI_LOG_LEVEL") {
            logging.level = level;
        }

        Ok(Self {
            datastore: DatastoreConfig {
                url: lookup("SUPABASE_URL").or_else(|| toml_config.supabase_url.clone()),
                service_key: lookup("SUPABASE_SERVICE_KEY")
                    .or_else(|| toml_config.supabase_service_key.clone()),
            },
            provider,
            gemini: resolve_model(&toml_config.gemini, "GEMINI", DEFAULT_GEMINI_MODEL, GEMINI_API_BASE),
            openai: resolve_model(&toml_config.openai, "OPENAI", DEFAULT_OPENAI_MODEL, OPENAI_API_BASE),
            server: ServerConfig {
                host: lookup("AI_SERVICE_HOST")
                    .or_else(|| toml_config.server.host.clone())
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            logging,
            limits: toml_config.limits.clone(),
        })
    }

    /// Check that datastore credentials are present
    pub fn validate_datastore(&self) -> Result<()> {
        let url_ok = self.datastore.url.as_deref().is_some_and(|v| !v.trim().is_empty());
        let key_ok = self.datastore.service_key.as_deref().is_some_and(|v| !v.trim().is_empty());
        if url_ok && key_ok {
            Ok(())
        } else {
            Err(Error::Config(
                "SUPABASE_URL and SUPABASE_SERVICE_KEY must be set".to_string(),
            ))
        }
    }

    /// Check every credential the insight service needs
    pub fn validate(&self) -> Result<()> {
        self.validate_datastore()?;

        let has_key = self.active_model().api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            return Err(Error::Config(format!(
                "{} must be set when using {}",
                self.provider.api_key_env(),
                self.provider.display_name()
            )));
        }

        Ok(())
    }

    /// Settings for the selected provider
    pub fn active_model(&self) -> &ModelConfig {
        match self.provider {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::OpenAi => &self.openai,
        }
    }

    /// Description of the selected provider, e.g. `Google Gemini (gemini-1.5-flash)`
    pub fn provider_info(&self) -> String {
        format!("{} ({})", self.provider.display_name(), self.active_model().model)
    }
}

/// Per-user default config file location (`~/.config/cogni/cogni-ai.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cogni").join("cogni-ai.toml"))
}

/// Pick the TOML file to read, if any
///
/// An explicitly requested file that does not exist is reported and skipped.
pub fn locate_config_file<F>(explicit_path: Option<&Path>, env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let requested = explicit_path
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_PATH_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from));

    if let Some(path) = requested {
        if path.exists() {
            return Some(path);
        }
        warn!("Config file not found: {} (using environment and defaults)", path.display());
        return None;
    }

    default_config_path().filter(|path| path.exists())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}
