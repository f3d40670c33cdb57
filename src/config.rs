use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Openai,
    Openrouter,
    Ollama,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Openai => write!(f, "openai"),
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl SummarizerConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            LlmProvider::Openai => "https://api.openai.com/v1",
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Whether the remote summarizer can be used at all.
    /// Ollama runs locally and needs no key.
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() || self.provider == LlmProvider::Ollama
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: String::new(),
            api_key: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub reset_on_startup: bool,
    /// Hours between wholesale cache resets; 0 disables
    #[serde(default)]
    pub reset_interval_hours: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            reset_on_startup: false,
            reset_interval_hours: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: default_check_interval_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    100
}

fn default_temperature() -> f32 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a helpful assistant that summarizes video games.".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("posted_deals.json")
}

fn default_check_interval_hours() -> u64 {
    8
}

/// Longest accepted polling interval, one year
pub const MAX_CHECK_INTERVAL_HOURS: u64 = 24 * 365;

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Config::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style variables. `lookup` returns
    /// the raw value for a name, or None when unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = Some(url);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.summarizer.api_key = key;
        }
        if let Some(path) = lookup("POSTED_DEALS_FILE") {
            self.cache.path = PathBuf::from(path);
        }
        if let Some(flag) = lookup("RESET_CACHE_ON_STARTUP") {
            self.cache.reset_on_startup = parse_flag(&flag);
        }
        if let Some(hours) = lookup("CACHE_RESET_HOURS") {
            self.cache.reset_interval_hours = hours
                .trim()
                .parse()
                .with_context(|| format!("Invalid CACHE_RESET_HOURS: {}", hours))?;
        }
        if let Some(hours) = lookup("CHECK_INTERVAL_HOURS") {
            self.schedule.check_interval_hours = hours
                .trim()
                .parse()
                .with_context(|| format!("Invalid CHECK_INTERVAL_HOURS: {}", hours))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let check = self.schedule.check_interval_hours;
        if !(1..=MAX_CHECK_INTERVAL_HOURS).contains(&check) {
            anyhow::bail!(
                "check_interval_hours must be between 1 and {}, got {}",
                MAX_CHECK_INTERVAL_HOURS,
                check
            );
        }
        let reset = self.cache.reset_interval_hours;
        if !reset.is_finite() || reset < 0.0 {
            anyhow::bail!("cache reset_interval_hours must be >= 0, got {}", reset);
        }
        if Duration::try_from_secs_f64(reset * 3600.0).is_err() {
            anyhow::bail!("cache reset_interval_hours is too large: {}", reset);
        }
        Ok(())
    }

    /// Polling interval. Values past the validated range saturate.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.check_interval_hours.saturating_mul(3600))
    }

    /// Interval between cache resets, None when disabled or out of range
    pub fn cache_reset_interval(&self) -> Option<Duration> {
        let hours = self.cache.reset_interval_hours;
        if hours > 0.0 {
            Duration::try_from_secs_f64(hours * 3600.0).ok()
        } else {
            None
        }
    }
}
