use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CITY: &str = "Blumenau";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5001";
const DEFAULT_OWM_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_OWM_LANG: &str = "pt_br";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DISPLAY_UTC_OFFSET_HOURS: i64 = -3;
const DISPLAY_UTC_OFFSET_RANGE: std::ops::RangeInclusive<i64> = -12..=14;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Startup configuration. Built once and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Config {
    pub owm_api_key: String,
    pub owm_base_url: String,
    pub owm_lang: String,
    pub telegram_bot_token: String,
    pub telegram_api_base: String,
    /// Lowercase, matched against the normalized command text.
    pub bot_username: String,
    pub city: String,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_topic: String,
    pub http_addr: String,
    pub upstream_timeout: Duration,
    pub display_utc_offset_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &'static str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let owm_api_key = required("OWM_API_KEY")?;
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let bot_username = required("BOT_USERNAME")?
            .trim_start_matches('@')
            .to_lowercase();
        let mqtt_broker = required("MQTT_BROKER")?;
        let mqtt_topic = required("MQTT_TOPIC")?;

        let mqtt_port = parse_or("MQTT_PORT", lookup("MQTT_PORT"), DEFAULT_MQTT_PORT)?;
        let timeout_secs: u64 = parse_or(
            "UPSTREAM_TIMEOUT_SECS",
            lookup("UPSTREAM_TIMEOUT_SECS"),
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        let display_utc_offset_hours = parse_or(
            "DISPLAY_UTC_OFFSET_HOURS",
            lookup("DISPLAY_UTC_OFFSET_HOURS"),
            DEFAULT_DISPLAY_UTC_OFFSET_HOURS,
        )?;
        if !DISPLAY_UTC_OFFSET_RANGE.contains(&display_utc_offset_hours) {
            return Err(ConfigError::Invalid {
                key: "DISPLAY_UTC_OFFSET_HOURS",
                value: display_utc_offset_hours.to_string(),
            });
        }

        Ok(Self {
            owm_api_key,
            owm_base_url: optional("OWM_BASE_URL", DEFAULT_OWM_BASE_URL),
            owm_lang: optional("OWM_LANG", DEFAULT_OWM_LANG),
            telegram_bot_token,
            telegram_api_base: optional("TELEGRAM_API_BASE", DEFAULT_TELEGRAM_API_BASE),
            bot_username,
            city: optional("CITY", DEFAULT_CITY),
            mqtt_broker,
            mqtt_port,
            mqtt_topic,
            http_addr: optional("HTTP_ADDR", DEFAULT_HTTP_ADDR),
            upstream_timeout: Duration::from_secs(timeout_secs),
            display_utc_offset_hours,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config(owm_base_url: &str, telegram_api_base: &str) -> Config {
    Config {
        owm_api_key: "test-key".to_string(),
        owm_base_url: owm_base_url.to_string(),
        owm_lang: DEFAULT_OWM_LANG.to_string(),
        telegram_bot_token: "123:abc".to_string(),
        telegram_api_base: telegram_api_base.to_string(),
        bot_username: "weatherbot".to_string(),
        city: DEFAULT_CITY.to_string(),
        mqtt_broker: "127.0.0.1".to_string(),
        mqtt_port: DEFAULT_MQTT_PORT,
        mqtt_topic: "weather/current".to_string(),
        http_addr: DEFAULT_HTTP_ADDR.to_string(),
        upstream_timeout: Duration::from_secs(2),
        display_utc_offset_hours: DEFAULT_DISPLAY_UTC_OFFSET_HOURS,
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
