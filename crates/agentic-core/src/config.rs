//! # Configuration
//!
//! Agent configuration loaded from TOML files and environment variables.
//!
//! ## Sources (in priority order)
//!
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`AGENTIC_*` prefix, plus `OPENAI_API_KEY`)
//! 3. Project-level config (`.agentic/config.toml`)
//! 4. Global config (`~/.config/agentic/config.toml`)
//! 5. Default values
//!
//! ## Example
//!
//! ```toml
//! [models]
//! provider = "ollama"
//! vision_model = "llava"
//! reasoning_model = "llama3"
//!
//! [automation]
//! backend = "browser"
//! headless = false
//!
//! [cycle]
//! max_cycles = 40
//! ```

use crate::controller::CycleBudget;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur in configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Model backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    OpenAi,
    Ollama,
}

impl FromStr for ModelProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::InvalidConfig(format!(
                "Unknown model provider '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Which automation backend drives the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Playwright-driven Chromium
    Browser,
    /// OS mouse/keyboard and screen capture
    Desktop,
    /// Selector actions in the browser, coordinate actions on the desktop
    Hybrid,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "desktop" => Ok(Self::Desktop),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ConfigError::InvalidConfig(format!(
                "Unknown automation backend '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::Desktop => write!(f, "desktop"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Where long-term memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    None,
    Memory,
    Sqlite,
}

/// Model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: ModelProvider,

    /// Override the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (falls back to OPENAI_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    #[serde(default = "default_reasoning_model")]
    pub reasoning_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> ModelProvider {
    ModelProvider::OpenAi
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_reasoning_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_model_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            api_key: None,
            vision_model: default_vision_model(),
            reasoning_model: default_reasoning_model(),
            temperature: default_temperature(),
            timeout_secs: default_model_timeout(),
        }
    }
}

/// Automation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    #[serde(default)]
    pub headless: bool,

    /// Pause between actions of one plan
    #[serde(default = "default_action_delay")]
    pub action_delay_ms: u64,

    /// Wheel units per desktop scroll step
    #[serde(default = "default_scroll_amount")]
    pub scroll_amount: i32,
}

fn default_backend() -> BackendKind {
    BackendKind::Browser
}

fn default_action_delay() -> u64 {
    500
}

fn default_scroll_amount() -> i32 {
    10
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            headless: false,
            action_delay_ms: default_action_delay(),
            scroll_amount: default_scroll_amount(),
        }
    }
}

/// Loop limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_max_cycles")]
    pub max_cycles: Option<u32>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_cycle_delay")]
    pub cycle_delay_ms: u64,
}

fn default_max_cycles() -> Option<u32> {
    Some(25)
}

fn default_cycle_delay() -> u64 {
    2000
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            timeout_secs: None,
            cycle_delay_ms: default_cycle_delay(),
        }
    }
}

/// Memory store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: MemoryBackend,

    /// SQLite database path (defaults to the data directory)
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_memory_backend() -> MemoryBackend {
    MemoryBackend::Memory
}

fn default_search_limit() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
            search_limit: default_search_limit(),
        }
    }
}

impl MemoryConfig {
    /// Database path, falling back to `<data_dir>/agentic/memory.db`
    pub fn database_path(&self) -> Option<PathBuf> {
        self.path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("agentic").join("memory.db")))
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Idle seconds before an unfinished session is stopped; 0 keeps sessions forever
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_session_ttl() -> u64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl ServerConfig {
    /// How long an untouched session may keep its automation backend
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub automation: AutomationConfig,

    #[serde(default)]
    pub cycle: CycleConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl AgentConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                config = Self::load_from_file(&global_path)?;
            }
        }

        if let Some(project_path) = Self::project_config_path() {
            if project_path.exists() {
                debug!("Loading project config from {:?}", project_path);
                config = Self::load_from_file(&project_path)?;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, then apply the environment
    pub fn load_with(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("AGENTIC_PROVIDER").and_then(|p| p.parse().ok()) {
            self.models.provider = provider;
        }

        if let Some(url) = var("AGENTIC_BASE_URL") {
            self.models.base_url = Some(url);
        }

        if let Some(key) = var("AGENTIC_API_KEY") {
            self.models.api_key = Some(key);
        } else if self.models.api_key.is_none() {
            self.models.api_key = var("OPENAI_API_KEY");
        }

        if let Some(model) = var("AGENTIC_VISION_MODEL") {
            self.models.vision_model = model;
        }

        if let Some(model) = var("AGENTIC_REASONING_MODEL") {
            self.models.reasoning_model = model;
        }

        if let Some(backend) = var("AGENTIC_BACKEND").and_then(|b| b.parse().ok()) {
            self.automation.backend = backend;
        }

        if let Some(headless) = var("AGENTIC_HEADLESS") {
            self.automation.headless = headless == "1" || headless.to_lowercase() == "true";
        }

        if let Some(cycles) = var("AGENTIC_MAX_CYCLES").and_then(|c| c.parse().ok()) {
            self.cycle.max_cycles = Some(cycles);
        }

        if let Some(addr) = var("AGENTIC_ADDR") {
            self.server.addr = addr;
        }

        if let Some(ttl) = var("AGENTIC_SESSION_TTL_SECS").and_then(|t| t.parse().ok()) {
            self.server.session_ttl_secs = ttl;
        }
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content)?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializationError(e.to_string()))
    }

    /// Get the global config path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agentic").join("config.toml"))
    }

    /// Get the project config path (in current directory)
    pub fn project_config_path() -> Option<PathBuf> {
        std::env::current_dir()
            .ok()
            .map(|d| d.join(".agentic").join("config.toml"))
    }

    /// Cycle budget for full runs
    pub fn budget(&self) -> CycleBudget {
        CycleBudget {
            max_cycles: self.cycle.max_cycles,
            timeout: self.cycle.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.models.timeout_secs)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.automation.action_delay_ms)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle.cycle_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.models.temperature) {
            return Err(ConfigError::InvalidConfig(
                "Temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.models.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Model timeout must be greater than 0".to_string(),
            ));
        }

        if self.cycle.max_cycles == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_cycles must be greater than 0".to_string(),
            ));
        }

        if self.cycle.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Cycle timeout must be greater than 0".to_string(),
            ));
        }

        if self.automation.scroll_amount <= 0 {
            return Err(ConfigError::InvalidConfig(
                "scroll_amount must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.models.provider, ModelProvider::OpenAi);
        assert_eq!(config.automation.backend, BackendKind::Browser);
        assert_eq!(config.cycle.max_cycles, Some(25));
        assert_eq!(config.server.addr, "127.0.0.1:8000");
        assert_eq!(config.server.session_ttl(), Some(Duration::from_secs(600)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[models]\nprovider = \"ollama\"\nvision_model = \"llava\"\n\n[automation]\nbackend = \"hybrid\"\n",
        )
        .unwrap();

        let config = AgentConfig::load_from_file(&path).unwrap();
        assert_eq!(config.models.provider, ModelProvider::Ollama);
        assert_eq!(config.models.vision_model, "llava");
        assert_eq!(config.models.reasoning_model, "gpt-4o");
        assert_eq!(config.automation.backend, BackendKind::Hybrid);
        assert_eq!(config.cycle.cycle_delay_ms, 2000);
        assert_eq!(config.loaded_from.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AgentConfig::default();
        config.cycle.max_cycles = Some(7);
        config.memory.backend = MemoryBackend::Sqlite;
        config.save_to_file(&path).unwrap();

        let loaded = AgentConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.cycle.max_cycles, Some(7));
        assert_eq!(loaded.memory.backend, MemoryBackend::Sqlite);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AGENTIC_PROVIDER", "ollama"),
            ("AGENTIC_BACKEND", "desktop"),
            ("AGENTIC_MAX_CYCLES", "3"),
            ("AGENTIC_HEADLESS", "true"),
            ("OPENAI_API_KEY", "sk-test"),
            ("AGENTIC_SESSION_TTL_SECS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = AgentConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.models.provider, ModelProvider::Ollama);
        assert_eq!(config.automation.backend, BackendKind::Desktop);
        assert_eq!(config.cycle.max_cycles, Some(3));
        assert!(config.automation.headless);
        assert_eq!(config.models.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.server.session_ttl(), None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AgentConfig::default();

        config.models.temperature = 3.0;
        assert!(config.validate().is_err());
        config.models.temperature = 0.2;

        config.cycle.max_cycles = Some(0);
        assert!(config.validate().is_err());
        config.cycle.max_cycles = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_budget_from_config() {
        let mut config = AgentConfig::default();
        config.cycle.timeout_secs = Some(30);
        let budget = config.budget();
        assert_eq!(budget.max_cycles, Some(25));
        assert_eq!(budget.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Hybrid".parse::<BackendKind>().unwrap(), BackendKind::Hybrid);
        assert!("vnc".parse::<BackendKind>().is_err());
        assert_eq!("OpenAI".parse::<ModelProvider>().unwrap(), ModelProvider::OpenAi);
    }
}
