use crate::config::Config;
use crate::errors::{truncate_body, Error, Result};
use crate::metrics::{UPSTREAM_FAILURES_TOTAL, UPSTREAM_LATENCY_SECONDS};
use crate::model::ChatId;
use async_trait::async_trait;
use reqwest::Client;
use tokio::time::Instant;
use tracing::{info, warn};

pub const DEFAULT_PARSE_MODE: &str = "HTML";

/// Outbound chat channel. Returns whether the platform accepted the message.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: &ChatId, text: &str, parse_mode: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    send_url: String,
}

impl TelegramClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(config.upstream_timeout).build()?;

        Ok(Self {
            http,
            send_url: build_api_url(
                &config.telegram_api_base,
                &config.telegram_bot_token,
                "sendMessage",
            ),
        })
    }

    async fn post_message(&self, chat_id: &ChatId, text: &str, parse_mode: &str) -> Result<()> {
        let chat_id = chat_id.to_string();
        let start = Instant::now();

        // The bot token is part of the URL, so it is stripped from errors.
        let res = self
            .http
            .post(&self.send_url)
            .form(&[
                ("chat_id", chat_id.as_str()),
                ("text", text),
                ("parse_mode", parse_mode),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = res.status();
        UPSTREAM_LATENCY_SECONDS
            .with_label_values(&["telegram"])
            .observe(start.elapsed().as_secs_f64());

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Status {
                status,
                body: truncate_body(&body),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: &ChatId, text: &str, parse_mode: &str) -> bool {
        match self.post_message(chat_id, text, parse_mode).await {
            Ok(()) => {
                info!("Message sent to chat {}", chat_id);
                true
            }
            Err(e) => {
                warn!("Failed to send message to chat {}: {}", chat_id, e);
                UPSTREAM_FAILURES_TOTAL
                    .with_label_values(&["telegram"])
                    .inc();
                false
            }
        }
    }
}

fn build_api_url(api_base: &str, bot_token: &str, method: &str) -> String {
    format!(
        "{}/bot{}/{}",
        api_base.trim_end_matches('/'),
        bot_token,
        method
    )
}
