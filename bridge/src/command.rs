/// Forecast horizons users may ask for.
pub const ALLOWED_FORECAST_HOURS: [u32; 3] = [6, 12, 24];

const CURRENT_PREFIX: &str = "/clima@";
const FORECAST_PREFIX: &str = "/previsao_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CurrentWeather,
    Forecast(ForecastRequest),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastRequest {
    Hours(u32),
    /// A number, but not one of `ALLOWED_FORECAST_HOURS`.
    UnsupportedHours(i64),
    /// The hour part is missing or not a number.
    Malformed,
}

/// Classifies raw chat text addressed to `bot_username` (expected lowercase).
pub fn parse(raw_text: &str, bot_username: &str) -> Command {
    let normalized = raw_text.trim().to_lowercase();
    let mention = format!("@{}", bot_username);

    if normalized == format!("{}{}", CURRENT_PREFIX, bot_username) {
        return Command::CurrentWeather;
    }

    if normalized.starts_with(FORECAST_PREFIX) && normalized.ends_with(&mention) {
        return Command::Forecast(parse_forecast_hours(&normalized));
    }

    Command::Unrecognized
}

/// Takes the text between the first `_` and the `h` that follows it.
fn parse_forecast_hours(normalized: &str) -> ForecastRequest {
    let Some((_, rest)) = normalized.split_once('_') else {
        return ForecastRequest::Malformed;
    };
    let digits = rest.split('h').next().unwrap_or_default().trim();

    match digits.parse::<i64>() {
        Ok(hours) => match u32::try_from(hours) {
            Ok(h) if ALLOWED_FORECAST_HOURS.contains(&h) => ForecastRequest::Hours(h),
            _ => ForecastRequest::UnsupportedHours(hours),
        },
        // Digits that overflow are still a number, just not an allowed one.
        Err(_) if is_integer(digits) => ForecastRequest::UnsupportedHours(
            if digits.starts_with('-') { i64::MIN } else { i64::MAX },
        ),
        Err(_) => ForecastRequest::Malformed,
    }
}

fn is_integer(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit())
}

impl Command {
    /// Label used for the commands metric.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CurrentWeather => "current",
            Command::Forecast(ForecastRequest::Hours(_)) => "forecast",
            Command::Forecast(_) => "forecast_invalid",
            Command::Unrecognized => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "weatherbot";

    #[test]
    fn test_current_weather_command() {
        assert_eq!(parse("/clima@weatherbot", BOT), Command::CurrentWeather);
        assert_eq!(parse("  /CLIMA@WeatherBot \n", BOT), Command::CurrentWeather);
    }

    #[test]
    fn test_current_weather_requires_exact_match() {
        assert_eq!(parse("/clima", BOT), Command::Unrecognized);
        assert_eq!(parse("/clima@otherbot", BOT), Command::Unrecognized);
        assert_eq!(parse("/clima@weatherbot agora", BOT), Command::Unrecognized);
    }

    #[test]
    fn test_allowed_forecast_hours() {
        for hours in ALLOWED_FORECAST_HOURS {
            let text = format!("/previsao_{}h@weatherbot", hours);
            assert_eq!(
                parse(&text, BOT),
                Command::Forecast(ForecastRequest::Hours(hours))
            );
        }
    }

    #[test]
    fn test_unsupported_forecast_hours() {
        assert_eq!(
            parse("/previsao_5h@weatherbot", BOT),
            Command::Forecast(ForecastRequest::UnsupportedHours(5))
        );
        assert_eq!(
            parse("/previsao_48h@weatherbot", BOT),
            Command::Forecast(ForecastRequest::UnsupportedHours(48))
        );
        assert_eq!(
            parse("/previsao_-6h@weatherbot", BOT),
            Command::Forecast(ForecastRequest::UnsupportedHours(-6))
        );
        assert_eq!(
            parse("/previsao_99999999999999999999h@weatherbot", BOT),
            Command::Forecast(ForecastRequest::UnsupportedHours(i64::MAX))
        );
        assert_eq!(
            parse("/previsao_-99999999999999999999h@weatherbot", BOT),
            Command::Forecast(ForecastRequest::UnsupportedHours(i64::MIN))
        );
    }

    #[test]
    fn test_malformed_forecast() {
        assert_eq!(
            parse("/previsao_xh@weatherbot", BOT),
            Command::Forecast(ForecastRequest::Malformed)
        );
        assert_eq!(
            parse("/previsao_@weatherbot", BOT),
            Command::Forecast(ForecastRequest::Malformed)
        );
    }

    #[test]
    fn test_forecast_without_mention_is_unrecognized() {
        assert_eq!(parse("/previsao_6h", BOT), Command::Unrecognized);
        assert_eq!(parse("/previsao_6h@otherbot", BOT), Command::Unrecognized);
    }

    #[test]
    fn test_bot_username_with_underscore() {
        let bot = "sahm2_bot";
        assert_eq!(
            parse("/previsao_12h@sahm2_bot", bot),
            Command::Forecast(ForecastRequest::Hours(12))
        );
    }

    #[test]
    fn test_hours_without_trailing_h_is_malformed() {
        assert_eq!(
            parse("/previsao_6@weatherbot", BOT),
            Command::Forecast(ForecastRequest::Malformed)
        );
    }

    #[test]
    fn test_unrelated_text() {
        assert_eq!(parse("bom dia pessoal", BOT), Command::Unrecognized);
        assert_eq!(parse("", BOT), Command::Unrecognized);
    }
}
