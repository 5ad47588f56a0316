use crate::config::Config;
use crate::errors::{truncate_body, Error, Result};
use crate::metrics::{UPSTREAM_FAILURES_TOTAL, UPSTREAM_LATENCY_SECONDS};
use crate::model::{CurrentWeather, ForecastBlock, ForecastOutcome};
use crate::replies::capitalize;
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

const MS_TO_KMH: f64 = 3.6;
const FORECAST_STEP_HOURS: u32 = 3;
const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of current conditions and 3-hour forecasts.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Failures are logged here; callers only decide what to tell the user.
    async fn fetch_current(&self, city: &str) -> Result<CurrentWeather>;

    async fn fetch_forecast(&self, city: &str, hours: u32) -> ForecastOutcome;
}

/// OpenWeatherMap client (metric units, localized descriptions).
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    lang: String,
    utc_offset_hours: i64,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(config.upstream_timeout).build()?;

        Ok(Self {
            api_key: config.owm_api_key.clone(),
            base_url: config.owm_base_url.trim_end_matches('/').to_string(),
            lang: config.owm_lang.clone(),
            utc_offset_hours: config.display_utc_offset_hours,
            http,
        })
    }

    async fn get(&self, endpoint: &str, city: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let start = Instant::now();

        // `without_url` keeps the API key out of error messages.
        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| Error::Http(e.without_url()))?;

        UPSTREAM_LATENCY_SECONDS
            .with_label_values(&["weather"])
            .observe(start.elapsed().as_secs_f64());
        debug!("OpenWeather /{} answered {}", endpoint, status);

        if !status.is_success() {
            return Err(Error::Status {
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }

    async fn current(&self, city: &str) -> Result<CurrentWeather> {
        let body = self.get("weather", city).await?;
        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;

        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| Error::MalformedResponse("empty `weather` array".to_string()))?;

        Ok(CurrentWeather {
            city: parsed.name.unwrap_or_else(|| city.to_string()),
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            humidity: parsed.main.humidity,
            wind_speed: format!("{} km/h", format_decimal(round2(parsed.wind.speed * MS_TO_KMH))),
            description,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_current(&self, city: &str) -> Result<CurrentWeather> {
        let result = self.current(city).await;
        if let Err(e) = &result {
            warn!("Failed to fetch current weather for {}: {}", city, e);
            UPSTREAM_FAILURES_TOTAL.with_label_values(&["weather"]).inc();
        }
        result
    }

    async fn fetch_forecast(&self, city: &str, hours: u32) -> ForecastOutcome {
        let outcome = match self.get("forecast", city).await {
            Ok(body) => parse_forecast(&body, hours, self.utc_offset_hours),
            Err(e) => ForecastOutcome::Transport(e.to_string()),
        };

        match &outcome {
            ForecastOutcome::Blocks(blocks) => {
                debug!("Forecast for {}: {} blocks", city, blocks.len());
            }
            ForecastOutcome::NotFound => {
                warn!("Forecast response for {} has no `list` field", city);
                UPSTREAM_FAILURES_TOTAL.with_label_values(&["weather"]).inc();
            }
            ForecastOutcome::Transport(detail) | ForecastOutcome::Parse(detail) => {
                warn!("Failed to fetch forecast for {}: {}", city, detail);
                UPSTREAM_FAILURES_TOTAL.with_label_values(&["weather"]).inc();
            }
        }

        outcome
    }
}

/// Builds at most `hours / 3` blocks from the start of the provider's `list`.
fn parse_forecast(body: &str, hours: u32, utc_offset_hours: i64) -> ForecastOutcome {
    let data: Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(e) => return ForecastOutcome::Parse(e.to_string()),
    };

    let Some(list) = data.get("list") else {
        return ForecastOutcome::NotFound;
    };
    let Some(entries) = list.as_array() else {
        return ForecastOutcome::Parse("`list` is not an array".to_string());
    };

    let count = ((hours / FORECAST_STEP_HOURS) as usize).min(entries.len());

    match entries[..count]
        .iter()
        .map(|entry| parse_block(entry, utc_offset_hours))
        .collect::<Result<Vec<_>>>()
    {
        Ok(blocks) => ForecastOutcome::Blocks(blocks),
        Err(e) => ForecastOutcome::Parse(e.to_string()),
    }
}

fn parse_block(entry: &Value, utc_offset_hours: i64) -> Result<ForecastBlock> {
    let entry = OwForecastEntry::deserialize(entry)?;

    let utc = NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT).map_err(|e| {
        Error::MalformedResponse(format!("invalid dt_txt {:?}: {}", entry.dt_txt, e))
    })?;
    let local = TimeDelta::try_hours(utc_offset_hours)
        .and_then(|offset| utc.checked_add_signed(offset))
        .ok_or_else(|| {
            Error::MalformedResponse(format!(
                "dt_txt {:?} out of range with offset {}h",
                entry.dt_txt, utc_offset_hours
            ))
        })?;

    let description = entry
        .weather
        .first()
        .map(|w| capitalize(&w.description))
        .ok_or_else(|| Error::MalformedResponse("empty `weather` array".to_string()))?;

    Ok(ForecastBlock {
        local_time: local.format("%H:%M").to_string(),
        temperature: entry.main.temp,
        feels_like: entry.main.feels_like,
        description,
        humidity: entry.main.humidity,
        wind_speed_kmh: entry.wind.speed * MS_TO_KMH,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shortest representation, but always with a fractional part: `43.2`, `10.0`.
fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}
