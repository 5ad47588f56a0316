mod command;
mod config;
mod errors;
mod metrics;
mod model;
mod mqtt;
mod replies;
mod telegram;
mod weather;
mod webhook;

use axum::{routing::get, Router};
use config::Config;
use mqtt::MqttPublisher;
use std::sync::Arc;
use telegram::TelegramClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use weather::OpenWeatherClient;
use webhook::Bridge;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting weather bridge for {} (@{})", config.city, config.bot_username);
    info!("MQTT broker: {}:{}, topic: {}", config.mqtt_broker, config.mqtt_port, config.mqtt_topic);
    info!("HTTP server: {}", config.http_addr);

    metrics::init_metrics();

    let weather = match OpenWeatherClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build weather client: {}", e);
            std::process::exit(1);
        }
    };
    let messenger = match TelegramClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build Telegram client: {}", e);
            std::process::exit(1);
        }
    };
    let telemetry = MqttPublisher::new(&config);

    let http_addr = config.http_addr.clone();
    let bridge = Bridge::new(
        Arc::new(config),
        Arc::new(weather),
        Arc::new(messenger),
        Arc::new(telemetry),
    );

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(webhook::create_router(bridge));

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }

    info!("Shutting down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
