//! # Configuration Management Module
//!
//! Typed configuration for the bot, loaded from an optional TOML file and then
//! overridden from the environment.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - Identity and command prefix
//! - [`IrcConfig`] - Server, channel and NickServ credentials
//! - [`StorageConfig`] - Where the sled database lives
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`WeatherConfig`] - OpenWeatherMap key and backend selection
//! - [`HuntConfig`] - Creature spawn timing
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! nickname = "jadebot"
//! command_prefix = ";"
//!
//! [irc]
//! server = "irc.snoonet.org:6667"
//! channel = "#jadebotdev"
//!
//! [weather]
//! backend = "onecall"
//!
//! [hunt]
//! min_delay_secs = 360
//! max_delay_secs = 3540
//! ```
//!
//! ## Environment Integration
//!
//! Precedence is environment > config file > defaults. Recognised variables:
//! `CHANNEL`, `NICKNAME`, `NICKSERV_PASS`, `OWM_API_KEY`, and `OWM_V25` (any
//! non-empty value selects the simpler current-conditions weather backend).
//!
//! A missing weather key is deliberately not a startup error; the weather command
//! reports it when used.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::bot::commands::ALLOWED_PREFIXES;

pub const ENV_CHANNEL: &str = "CHANNEL";
pub const ENV_NICKNAME: &str = "NICKNAME";
pub const ENV_NICKSERV_PASS: &str = "NICKSERV_PASS";
pub const ENV_OWM_API_KEY: &str = "OWM_API_KEY";
pub const ENV_OWM_V25: &str = "OWM_V25";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub nickname: String,
    /// Single character from the allowed prefix set. Defaults to ";".
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_command_prefix() -> String {
    ";".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcConfig {
    /// `host:port` of a plain-text IRC server.
    pub server: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickserv_password: Option<String>,
    /// Minimum gap between two outgoing lines (ms), to stay under flood limits.
    #[serde(default = "default_min_send_gap_ms")]
    pub min_send_gap_ms: u64,
}

fn default_min_send_gap_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Which OpenWeatherMap flow answers weather queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherBackend {
    /// Direct current-conditions lookup by place name (API 2.5).
    Current,
    /// Nominatim geocode, then One Call 3.0 by coordinates.
    OneCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    pub api_key: String,
    pub backend: WeatherBackend,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Cache TTL in minutes (0 disables caching)
    pub cache_ttl_minutes: u32,
    /// User-Agent sent to Nominatim, which requires an identifying one
    pub user_agent: String,
    /// OpenWeatherMap 2.5 current-conditions endpoint
    pub current_url: String,
    /// OpenWeatherMap One Call 3.0 endpoint
    pub onecall_url: String,
    /// Nominatim search endpoint
    pub geocode_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            backend: WeatherBackend::OneCall,
            timeout_seconds: 10,
            cache_ttl_minutes: 10,
            user_agent: format!("shalebot/{} (djade942@gmail.com)", env!("CARGO_PKG_VERSION")),
            current_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            onecall_url: "https://api.openweathermap.org/data/3.0/onecall".to_string(),
            geocode_url: "https://nominatim.openstreetmap.org/search".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Use `debug_delay_secs` for every spawn instead of the random window.
    pub debug: bool,
    #[serde(default = "default_debug_delay_secs")]
    pub debug_delay_secs: u64,
    /// Spawn a creature as soon as the channel is joined.
    #[serde(default = "default_spawn_on_join")]
    pub spawn_on_join: bool,
}

fn default_debug_delay_secs() -> u64 {
    8
}

fn default_spawn_on_join() -> bool {
    true
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 360,
            max_delay_secs: 3540,
            debug: false,
            debug_delay_secs: default_debug_delay_secs(),
            spawn_on_join: default_spawn_on_join(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub irc: IrcConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub hunt: HuntConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Load `path` when it exists, otherwise start from defaults. Environment
    /// overrides are applied either way.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::load(path).await?
        } else {
            Self::default()
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        config.apply_env(&env);
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Overlay recognised environment variables. Empty values are ignored.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        if let Some(channel) = get(ENV_CHANNEL) {
            self.irc.channel = channel.to_string();
        }
        if let Some(nick) = get(ENV_NICKNAME) {
            self.bot.nickname = nick.to_string();
        }
        if let Some(pass) = get(ENV_NICKSERV_PASS) {
            self.irc.nickserv_password = Some(pass.to_string());
        }
        if let Some(key) = get(ENV_OWM_API_KEY) {
            self.weather.api_key = key.to_string();
        }
        if get(ENV_OWM_V25).is_some() {
            self.weather.backend = WeatherBackend::Current;
        }
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.bot.nickname.trim().is_empty() {
            return Err(anyhow!("bot.nickname must not be empty"));
        }
        if self.bot.nickname.contains(char::is_whitespace) {
            return Err(anyhow!("bot.nickname '{}' must not contain spaces", self.bot.nickname));
        }
        let channel = self.irc.channel.trim();
        if channel.is_empty() || !(channel.starts_with('#') || channel.starts_with('&')) {
            return Err(anyhow!(
                "irc.channel '{}' must start with '#' or '&'",
                self.irc.channel
            ));
        }
        if self.irc.server.trim().is_empty() {
            return Err(anyhow!("irc.server must not be empty"));
        }
        let mut chars = self.bot.command_prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if ALLOWED_PREFIXES.contains(&c) => {}
            _ => {
                return Err(anyhow!(
                    "bot.command_prefix '{}' must be one of {:?}",
                    self.bot.command_prefix,
                    ALLOWED_PREFIXES
                ))
            }
        }
        if !self.hunt.debug && self.hunt.min_delay_secs >= self.hunt.max_delay_secs {
            return Err(anyhow!(
                "hunt.min_delay_secs ({}) must be below hunt.max_delay_secs ({})",
                self.hunt.min_delay_secs,
                self.hunt.max_delay_secs
            ));
        }
        if self.hunt.debug && self.hunt.debug_delay_secs == 0 {
            return Err(anyhow!("hunt.debug_delay_secs must be at least 1 when hunt.debug is set"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                nickname: "jadebot".to_string(),
                command_prefix: default_command_prefix(),
            },
            irc: IrcConfig {
                server: "irc.snoonet.org:6667".to_string(),
                channel: "#jadebotdev".to_string(),
                nickserv_password: None,
                min_send_gap_ms: default_min_send_gap_ms(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            weather: WeatherConfig::default(),
            hunt: HuntConfig::default(),
        }
    }
}
