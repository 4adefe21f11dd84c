use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::temporal::DEFAULT_TIMEZONE;

/// Application configuration
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timezone: String,
    pub llm: LLMConfig,
    pub dispatch: DispatchConfig,
    pub calendar: CalendarConfig,
    pub github: GitHubConfig,
    pub keywords: KeywordConfig,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: String,
    pub openai: ProviderConfig,
    pub openrouter: ProviderConfig,
}

/// Settings for one OpenAI-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Total attempts per provider call
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub http_timeout_secs: u64,
    /// Serve mock data for reads without trying the provider when no credential is set
    pub mock_without_credentials: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub access_token: Option<String>,
    pub calendar_id: String,
    pub api_url: String,
    pub default_max_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub api_url: String,
    pub default_repo: Option<String>,
    pub default_user: Option<String>,
}

/// Extra phrases appended to the built-in keyword tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub list: Vec<String>,
    pub create: Vec<String>,
    pub delete: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            llm: LLMConfig::default(),
            dispatch: DispatchConfig::default(),
            calendar: CalendarConfig::default(),
            github: GitHubConfig::default(),
            keywords: KeywordConfig::default(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            openai: ProviderConfig {
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
            },
            openrouter: ProviderConfig {
                api_key: None,
                model: "openai/gpt-4o-mini".to_string(),
                base_url: "https://openrouter.ai/api/v1".to_string(),
            },
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            http_timeout_secs: 30,
            mock_without_credentials: true,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            calendar_id: "primary".to_string(),
            api_url: "https://www.googleapis.com/calendar/v3".to_string(),
            default_max_results: 10,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
            default_repo: None,
            default_user: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.load_from_env();
        Ok(config)
    }

    /// The config file alone, without environment overrides
    pub fn load_file() -> Self {
        Self::load_from_file().unwrap_or_default()
    }

    /// Parse a TOML document; missing sections keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from file
    fn load_from_file() -> Option<Self> {
        let config_path = Self::get_config_path();
        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).ok()?;
            match Self::from_toml_str(&contents) {
                Ok(config) => Some(config),
                Err(e) => {
                    log::warn!("Ignoring invalid config file {}: {}", config_path.display(), e);
                    None
                }
            }
        } else {
            None
        }
    }

    /// Load configuration from environment variables
    fn load_from_env(&mut self) {
        if let Ok(timezone) = env::var("TASKWRIGHT_TIMEZONE") {
            self.timezone = timezone;
        }

        if let Ok(provider) = env::var("LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            self.llm.openai.api_key = Some(api_key);
        }

        if let Ok(api_key) = env::var("OPENROUTER_API_KEY") {
            self.llm.openrouter.api_key = Some(api_key);
        }

        if let Ok(token) = env::var("GOOGLE_CALENDAR_TOKEN") {
            self.calendar.access_token = Some(token);
        }

        if let Ok(calendar_id) = env::var("GOOGLE_CALENDAR_ID") {
            self.calendar.calendar_id = calendar_id;
        }

        if let Ok(token) = env::var("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }

        if let Ok(retries) = env::var("TASKWRIGHT_MAX_RETRIES") {
            match retries.parse() {
                Ok(value) => self.dispatch.max_retries = value,
                Err(_) => log::warn!("Ignoring invalid TASKWRIGHT_MAX_RETRIES '{}'", retries),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("taskwright");
        path.push("config.toml");
        path
    }

    /// Settings of the selected LLM provider
    pub fn llm_provider(&self) -> Option<&ProviderConfig> {
        match self.llm.provider.as_str() {
            "openai" => Some(&self.llm.openai),
            "openrouter" => Some(&self.llm.openrouter),
            _ => None,
        }
    }

    /// Get the API key for the current LLM provider, ignoring empty values
    pub fn get_llm_api_key(&self) -> Option<String> {
        self.llm_provider()
            .and_then(|p| p.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Get the model name for the current LLM provider
    pub fn get_llm_model(&self) -> String {
        self.llm_provider()
            .map(|p| p.model.clone())
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    pub fn calendar_token(&self) -> Option<&str> {
        self.calendar
            .access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Copy with every credential masked, for display
    pub fn redacted(&self) -> Self {
        fn mask(secret: &mut Option<String>) {
            if secret.as_deref().is_some_and(|s| !s.trim().is_empty()) {
                *secret = Some("********".to_string());
            }
        }

        let mut copy = self.clone();
        mask(&mut copy.llm.openai.api_key);
        mask(&mut copy.llm.openrouter.api_key);
        mask(&mut copy.calendar.access_token);
        mask(&mut copy.github.token);
        copy
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.llm_provider().is_none() {
            return Err(anyhow::anyhow!(
                "Invalid LLM provider '{}'. Must be 'openai' or 'openrouter'",
                self.llm.provider
            ));
        }

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(anyhow::anyhow!(
                "Unknown timezone '{}'. Use an IANA name such as 'Europe/Paris'",
                self.timezone
            ));
        }

        if self.dispatch.max_retries == 0 {
            return Err(anyhow::anyhow!("dispatch.max_retries must be at least 1"));
        }

        if self.dispatch.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!("dispatch.http_timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    /// Create a sample configuration file
    pub fn create_sample_config() -> Result<()> {
        let config = Self::default();
        let config_path = Self::get_config_path();

        if config_path.exists() {
            println!("Configuration file already exists at: {}", config_path.display());
            return Ok(());
        }

        config.save()?;

        println!("Created sample configuration file at: {}", config_path.display());
        println!("Please edit the file and set your credentials, or use environment variables:");
        println!("  OPENAI_API_KEY=your_openai_api_key");
        println!("  GOOGLE_CALENDAR_TOKEN=your_calendar_access_token");
        println!("  GITHUB_TOKEN=your_github_token");

        Ok(())
    }

    /// Set a configuration value
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "timezone" => {
                value
                    .parse::<chrono_tz::Tz>()
                    .map_err(|_| anyhow::anyhow!("Invalid timezone: {}", value))?;
                self.timezone = value.to_string();
            }
            "provider" | "llm.provider" => match value {
                "openai" | "openrouter" => {
                    self.llm.provider = value.to_string();
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid provider: {}. Must be 'openai' or 'openrouter'",
                        value
                    ));
                }
            },
            "openai.api_key" => {
                self.llm.openai.api_key = Some(value.to_string());
            }
            "openai.model" => {
                self.llm.openai.model = value.to_string();
            }
            "openrouter.api_key" => {
                self.llm.openrouter.api_key = Some(value.to_string());
            }
            "openrouter.model" => {
                self.llm.openrouter.model = value.to_string();
            }
            "dispatch.max_retries" => {
                self.dispatch.max_retries = value
                    .parse::<u32>()
                    .map_err(|_| anyhow::anyhow!("Invalid max_retries value: {}", value))?;
            }
            "dispatch.base_delay_ms" => {
                self.dispatch.base_delay_ms = value
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("Invalid base_delay_ms value: {}", value))?;
            }
            "dispatch.http_timeout_secs" => {
                self.dispatch.http_timeout_secs = value
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("Invalid http_timeout_secs value: {}", value))?;
            }
            "dispatch.mock_without_credentials" => {
                self.dispatch.mock_without_credentials = value.parse::<bool>().map_err(|_| {
                    anyhow::anyhow!("Invalid mock_without_credentials value: {}. Must be true or false", value)
                })?;
            }
            "calendar.access_token" => {
                self.calendar.access_token = Some(value.to_string());
            }
            "calendar.calendar_id" => {
                self.calendar.calendar_id = value.to_string();
            }
            "github.token" => {
                self.github.token = Some(value.to_string());
            }
            "github.default_repo" => {
                self.github.default_repo = Some(value.to_string());
            }
            "github.default_user" => {
                self.github.default_user = Some(value.to_string());
            }
            _ => {
                return Err(anyhow::anyhow!("Unknown configuration key: {}", key));
            }
        }
        Ok(())
    }

    /// Get available configuration keys
    pub fn get_available_keys() -> Vec<&'static str> {
        vec![
            "timezone",
            "provider",
            "openai.api_key",
            "openai.model",
            "openrouter.api_key",
            "openrouter.model",
            "dispatch.max_retries",
            "dispatch.base_delay_ms",
            "dispatch.http_timeout_secs",
            "dispatch.mock_without_credentials",
            "calendar.access_token",
            "calendar.calendar_id",
            "github.token",
            "github.default_repo",
            "github.default_user",
        ]
    }
}

/// Configuration builder for programmatic configuration
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn timezone(mut self, timezone: &str) -> Self {
        self.config.timezone = timezone.to_string();
        self
    }

    pub fn llm_provider(mut self, provider: &str) -> Self {
        self.config.llm.provider = provider.to_string();
        self
    }

    pub fn openai_api_key(mut self, api_key: &str) -> Self {
        self.config.llm.openai.api_key = Some(api_key.to_string());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.dispatch.max_retries = max_retries;
        self
    }

    pub fn base_delay_ms(mut self, delay: u64) -> Self {
        self.config.dispatch.base_delay_ms = delay;
        self
    }

    pub fn mock_without_credentials(mut self, enabled: bool) -> Self {
        self.config.dispatch.mock_without_credentials = enabled;
        self
    }

    pub fn calendar_token(mut self, token: &str) -> Self {
        self.config.calendar.access_token = Some(token.to_string());
        self
    }

    pub fn github_token(mut self, token: &str) -> Self {
        self.config.github.token = Some(token.to_string());
        self
    }

    pub fn github_default_repo(mut self, repo: &str) -> Self {
        self.config.github.default_repo = Some(repo.to_string());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
