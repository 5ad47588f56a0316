//! Chat-facing texts. Everything the bot says lives here.

use crate::model::{CurrentWeather, ForecastBlock, ForecastOutcome};

pub const CURRENT_WEATHER_UNAVAILABLE: &str = "Não foi possível obter os dados do clima atual.";
pub const FORECAST_HOURS_NOT_ALLOWED: &str =
    "Erro: Por favor, solicite a previsão para 6h, 12h ou 24h.";
pub const FORECAST_COMMAND_INVALID: &str =
    "Comando de previsão inválido. Use /previsao_6h, /previsao_12h ou /previsao_24h.";
pub const FORECAST_NOT_FOUND: &str = "Erro: dados de previsão não encontrados na resposta da API.";
pub const FORECAST_TRANSPORT_ERROR: &str = "Erro de conexão ao obter previsão do OpenWeatherMap.";
pub const FORECAST_PARSE_ERROR: &str = "Erro inesperado ao processar dados da previsão.";

const BLOCK_SEPARATOR: &str = "--------------------";

pub fn current_weather(weather: &CurrentWeather) -> String {
    format!(
        "🌤 Clima em {}:\n\
         🌡 Temperatura: {}°C\n\
         🤒 Sensação: {}°C\n\
         💧 Umidade: {}%\n\
         💨 Vento: {}\n\
         🔎 Descrição: {}",
        weather.city,
        weather.temperature,
        weather.feels_like,
        weather.humidity,
        weather.wind_speed,
        capitalize(&weather.description),
    )
}

pub fn forecast(hours: u32, city: &str, outcome: &ForecastOutcome) -> String {
    format!(
        "Previsão para as próximas {} horas em {}:\n\n{}",
        hours,
        city,
        forecast_body(outcome)
    )
}

fn forecast_body(outcome: &ForecastOutcome) -> String {
    match outcome {
        ForecastOutcome::Blocks(blocks) => blocks
            .iter()
            .map(forecast_block)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        ForecastOutcome::NotFound => FORECAST_NOT_FOUND.to_string(),
        ForecastOutcome::Transport(_) => FORECAST_TRANSPORT_ERROR.to_string(),
        ForecastOutcome::Parse(_) => FORECAST_PARSE_ERROR.to_string(),
    }
}

fn forecast_block(block: &ForecastBlock) -> String {
    format!(
        "<b>Horário:</b> {}\n\
         🌡️ Temperatura: {:.1}°C (sensação {:.1}°C)\n\
         ☁️ Condição: {}\n\
         💧 Umidade: {}%\n\
         💨 Vento: {:.1} km/h\n\
         {}",
        block.local_time,
        block.temperature,
        block.feels_like,
        block.description,
        block.humidity,
        block.wind_speed_kmh,
        BLOCK_SEPARATOR,
    )
}

/// Upper-cases the first character and lower-cases the rest.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(local_time: &str) -> ForecastBlock {
        ForecastBlock {
            local_time: local_time.to_string(),
            temperature: 21.36,
            feels_like: 21.0,
            description: "Nublado".to_string(),
            humidity: 70,
            wind_speed_kmh: 18.0,
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("céu limpo"), "Céu limpo");
        assert_eq!(capitalize("CHUVA FORTE"), "Chuva forte");
        assert_eq!(capitalize("ébrio"), "Ébrio");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_current_weather_reply() {
        let weather = CurrentWeather {
            city: "Blumenau".to_string(),
            temperature: 21.3,
            feels_like: 20.9,
            humidity: 60,
            wind_speed: "43.2 km/h".to_string(),
            description: "nuvens dispersas".to_string(),
        };

        assert_eq!(
            current_weather(&weather),
            "🌤 Clima em Blumenau:\n\
             🌡 Temperatura: 21.3°C\n\
             🤒 Sensação: 20.9°C\n\
             💧 Umidade: 60%\n\
             💨 Vento: 43.2 km/h\n\
             🔎 Descrição: Nuvens dispersas"
        );
    }

    #[test]
    fn test_forecast_blocks_rendering() {
        let outcome = ForecastOutcome::Blocks(vec![block("09:00"), block("12:00")]);
        let text = forecast(6, "Blumenau", &outcome);

        assert!(text.starts_with("Previsão para as próximas 6 horas em Blumenau:\n\n"));
        assert_eq!(text.matches("<b>Horário:</b>").count(), 2);
        assert!(text.contains("<b>Horário:</b> 09:00\n"));
        assert!(text.contains("🌡️ Temperatura: 21.4°C (sensação 21.0°C)"));
        assert!(text.contains("☁️ Condição: Nublado"));
        assert!(text.contains("💨 Vento: 18.0 km/h"));
        assert!(text.ends_with(BLOCK_SEPARATOR));
    }

    #[test]
    fn test_forecast_with_no_blocks() {
        let text = forecast(6, "Blumenau", &ForecastOutcome::Blocks(Vec::new()));
        assert_eq!(text, "Previsão para as próximas 6 horas em Blumenau:\n\n");
    }

    #[test]
    fn test_forecast_failures_stay_inside_template() {
        let header = "Previsão para as próximas 12 horas em Blumenau:\n\n";

        assert_eq!(
            forecast(12, "Blumenau", &ForecastOutcome::NotFound),
            format!("{}{}", header, FORECAST_NOT_FOUND)
        );

        let text = forecast(
            12,
            "Blumenau",
            &ForecastOutcome::Transport("connection refused (os error 111)".to_string()),
        );
        assert_eq!(text, format!("{}{}", header, FORECAST_TRANSPORT_ERROR));
        assert!(!text.contains("os error"));

        assert_eq!(
            forecast(12, "Blumenau", &ForecastOutcome::Parse("bad dt_txt".to_string())),
            format!("{}{}", header, FORECAST_PARSE_ERROR)
        );
    }
}
