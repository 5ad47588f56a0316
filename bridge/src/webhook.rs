use crate::command::{self, Command, ForecastRequest};
use crate::config::Config;
use crate::metrics::{COMMANDS_TOTAL, WEBHOOK_UPDATES_TOTAL};
use crate::model::{ChatId, InboundCommand, Update};
use crate::mqtt::TelemetrySink;
use crate::replies;
use crate::telegram::{Messenger, DEFAULT_PARSE_MODE};
use crate::weather::WeatherSource;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACK: &str = "OK";

/// Everything a webhook call needs. Cloning is cheap and shares the clients.
#[derive(Clone)]
pub struct Bridge {
    config: Arc<Config>,
    weather: Arc<dyn WeatherSource>,
    messenger: Arc<dyn Messenger>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Bridge {
    pub fn new(
        config: Arc<Config>,
        weather: Arc<dyn WeatherSource>,
        messenger: Arc<dyn Messenger>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            weather,
            messenger,
            telemetry,
        }
    }

    pub async fn handle(&self, inbound: InboundCommand) {
        let command = command::parse(&inbound.raw_text, &self.config.bot_username);
        COMMANDS_TOTAL.with_label_values(&[command.kind()]).inc();

        match command {
            Command::CurrentWeather => self.handle_current(&inbound.chat_id).await,
            Command::Forecast(request) => self.handle_forecast(&inbound.chat_id, request).await,
            Command::Unrecognized => {
                debug!("Unrecognized command from chat {}: {:?}", inbound.chat_id, inbound.raw_text);
            }
        }
    }

    async fn handle_current(&self, chat_id: &ChatId) {
        info!("Current weather requested by chat {}", chat_id);

        match self.weather.fetch_current(&self.config.city).await {
            Ok(weather) => {
                let text = replies::current_weather(&weather);
                self.reply(chat_id, &text).await;
                self.telemetry.publish(&weather).await;
            }
            Err(_) => {
                self.reply(chat_id, replies::CURRENT_WEATHER_UNAVAILABLE).await;
            }
        }
    }

    async fn handle_forecast(&self, chat_id: &ChatId, request: ForecastRequest) {
        let hours = match request {
            ForecastRequest::Hours(hours) => hours,
            ForecastRequest::UnsupportedHours(hours) => {
                debug!("Chat {} asked for an unsupported {}h forecast", chat_id, hours);
                self.reply(chat_id, replies::FORECAST_HOURS_NOT_ALLOWED).await;
                return;
            }
            ForecastRequest::Malformed => {
                self.reply(chat_id, replies::FORECAST_COMMAND_INVALID).await;
                return;
            }
        };

        info!("{}h forecast requested by chat {}", hours, chat_id);
        let outcome = self.weather.fetch_forecast(&self.config.city, hours).await;
        let text = replies::forecast(hours, &self.config.city, &outcome);
        self.reply(chat_id, &text).await;
    }

    async fn reply(&self, chat_id: &ChatId, text: &str) -> bool {
        self.messenger
            .send_message(chat_id, text, DEFAULT_PARSE_MODE)
            .await
    }
}

pub fn create_router(bridge: Bridge) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .route("/health", get(health))
        .with_state(bridge)
}

/// Always acknowledges: the platform retries any non-2xx answer.
async fn receive_update(State(bridge): State<Bridge>, body: Bytes) -> &'static str {
    WEBHOOK_UPDATES_TOTAL.inc();

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Ignoring unparsable webhook body: {}", e);
            return ACK;
        }
    };

    match update.into_command() {
        Some(inbound) => bridge.handle(inbound).await,
        None => debug!("Ignoring update without text or chat id"),
    }

    ACK
}

async fn health() -> &'static str {
    ACK
}
