use serde::{Deserialize, Serialize};
use std::fmt;

/// Current conditions for the configured city.
///
/// The serialized field names are the payload format published to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "sensacao")]
    pub feels_like: f64,
    #[serde(rename = "umidade")]
    pub humidity: u8,
    /// Already converted and rendered, e.g. `"43.2 km/h"`.
    #[serde(rename = "vento")]
    pub wind_speed: String,
    #[serde(rename = "descricao")]
    pub description: String,
}

/// One 3-hour forecast interval, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBlock {
    pub local_time: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub description: String,
    pub humidity: u8,
    pub wind_speed_kmh: f64,
}

/// Result of a forecast fetch. Formatting for the chat happens in `replies`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Blocks(Vec<ForecastBlock>),
    /// The provider answered without a `list` field.
    NotFound,
    Transport(String),
    Parse(String),
}

/// Telegram update, reduced to the fields the bridge reads.
#[derive(Debug, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chat: Option<Chat>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: Option<ChatId>,
}

/// Telegram sends numeric ids; string ids are accepted for channel usernames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Int(i64),
    Str(String),
}

impl ChatId {
    /// Mirrors the platform treating `0` and `""` as no chat at all.
    pub fn is_empty(&self) -> bool {
        match self {
            ChatId::Int(id) => *id == 0,
            ChatId::Str(id) => id.is_empty(),
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Int(id) => write!(f, "{}", id),
            ChatId::Str(id) => f.write_str(id),
        }
    }
}

/// A message that carries both a chat and non-empty text.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCommand {
    pub chat_id: ChatId,
    pub raw_text: String,
}

impl Update {
    pub fn into_command(self) -> Option<InboundCommand> {
        let message = self.message?;
        let raw_text = message.text.filter(|t| !t.is_empty())?;
        let chat_id = message.chat?.id.filter(|id| !id.is_empty())?;
        Some(InboundCommand { chat_id, raw_text })
    }
}
