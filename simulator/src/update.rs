use chrono::Utc;
use rand::Rng;
use serde::Serialize;

/// Minimal Telegram update, shaped like what the platform posts to a webhook.
#[derive(Debug, Clone, Serialize)]
pub struct Update {
    pub update_id: u64,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message_id: u64,
    pub date: i64,
    pub chat: Chat,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Current,
    Forecast,
    InvalidForecast,
    Noise,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Current => "current",
            CommandKind::Forecast => "forecast",
            CommandKind::InvalidForecast => "invalid_forecast",
            CommandKind::Noise => "noise",
        }
    }
}

const NOISE: [&str; 4] = ["bom dia", "alguém viu o jogo?", "/start", "/clima"];

/// Picks a command: mostly current weather, some forecasts, a little noise.
pub fn random_command(rng: &mut impl Rng, bot: &str) -> (CommandKind, String) {
    let roll = rng.gen_range(0..100);
    if roll < 50 {
        (CommandKind::Current, format!("/clima@{}", bot))
    } else if roll < 80 {
        let hours = [6, 12, 24][rng.gen_range(0..3)];
        (CommandKind::Forecast, format!("/previsao_{}h@{}", hours, bot))
    } else if roll < 90 {
        let hours = [1, 3, 5, 48][rng.gen_range(0..4)];
        (CommandKind::InvalidForecast, format!("/previsao_{}h@{}", hours, bot))
    } else {
        (CommandKind::Noise, NOISE[rng.gen_range(0..NOISE.len())].to_string())
    }
}

pub fn build_update(counter: u64, chat_id: i64, text: String) -> Update {
    Update {
        update_id: counter,
        message: Message {
            message_id: counter,
            date: Utc::now().timestamp(),
            chat: Chat {
                id: chat_id,
                kind: if chat_id < 0 { "group" } else { "private" },
            },
            text,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_commands_are_addressed_to_bot() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let (kind, text) = random_command(&mut rng, "weatherbot");
            match kind {
                CommandKind::Current => assert_eq!(text, "/clima@weatherbot"),
                CommandKind::Forecast | CommandKind::InvalidForecast => {
                    assert!(text.starts_with("/previsao_"));
                    assert!(text.ends_with("h@weatherbot"));
                }
                CommandKind::Noise => assert!(!text.ends_with("@weatherbot")),
            }
        }
    }

    #[test]
    fn test_update_shape() {
        let update = build_update(3, -100, "/clima@weatherbot".to_string());
        let value = serde_json::to_value(&update).unwrap();

        assert_eq!(value["update_id"], 3);
        assert_eq!(value["message"]["chat"]["id"], -100);
        assert_eq!(value["message"]["chat"]["type"], "group");
        assert_eq!(value["message"]["text"], "/clima@weatherbot");
    }
}
