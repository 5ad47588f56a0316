//! End-to-end checks against a running bridge, broker and real upstreams.
//!
//! Run with `cargo test -p weather-bridge -- --ignored` after starting the
//! bridge with valid credentials. `BRIDGE_URL`, `BOT_USERNAME`, `MQTT_BROKER`,
//! `MQTT_PORT` and `MQTT_TOPIC` must match the bridge's own settings.

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct PublishedWeather {
    cidade: String,
    temperatura: f64,
    sensacao: f64,
    umidade: u8,
    vento: String,
    descricao: String,
}

fn var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn update(text: &str) -> serde_json::Value {
    json!({
        "update_id": 1,
        "message": {"message_id": 1, "text": text, "chat": {"id": 1, "type": "private"}}
    })
}

async fn subscribe(topic: &str) -> anyhow::Result<mpsc::Receiver<Vec<u8>>> {
    let port: u16 = var("MQTT_PORT", "1883").parse()?;
    let mut mqtt_options = MqttOptions::new("live-test", var("MQTT_BROKER", "localhost"), port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);
    client.subscribe(topic, QoS::AtLeastOnce).await?;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        // Keep the client alive as long as the event loop runs.
        let _client = client;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if tx.send(publish.payload.to_vec()).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("MQTT error: {}", e);
                    break;
                }
            }
        }
    });

    // Give the SUBSCRIBE time to reach the broker.
    sleep(Duration::from_millis(500)).await;
    Ok(rx)
}

async fn post_update(http: &reqwest::Client, text: &str) -> anyhow::Result<(u16, String)> {
    let url = format!("{}/webhook", var("BRIDGE_URL", "http://localhost:5001"));
    let response = http.post(url).json(&update(text)).send().await?;
    let status = response.status().as_u16();
    Ok((status, response.text().await?))
}

#[tokio::test]
#[ignore]
async fn test_current_weather_is_published_on_every_request() -> anyhow::Result<()> {
    let bot = var("BOT_USERNAME", "weatherbot").to_lowercase();
    let topic = var("MQTT_TOPIC", "weather/current");
    let mut rx = subscribe(&topic).await?;
    let http = reqwest::Client::new();

    let start = Instant::now();
    let mut received = Vec::new();
    for _ in 0..2 {
        let (status, body) = post_update(&http, &format!("/clima@{}", bot)).await?;
        assert_eq!(status, 200);
        assert_eq!(body, "OK");

        let payload = timeout(Duration::from_secs(15), rx.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("subscriber closed"))?;
        let weather: PublishedWeather = serde_json::from_slice(&payload)?;
        assert!(weather.vento.ends_with(" km/h"));
        received.push(weather);
    }

    println!("Two publishes received in {:?}", start.elapsed());
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].cidade, received[1].cidade);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_ignored_commands_are_acknowledged() -> anyhow::Result<()> {
    let http = reqwest::Client::new();

    for text in ["bom dia", "/previsao_5h@someone_else", ""] {
        let (status, body) = post_update(&http, text).await?;
        assert_eq!(status, 200);
        assert_eq!(body, "OK");
    }
    Ok(())
}
