use crate::config::Config;
use crate::errors::{Error, Result};
use crate::metrics::{MQTT_PUBLISHED_TOTAL, UPSTREAM_FAILURES_TOTAL, UPSTREAM_LATENCY_SECONDS};
use crate::model::CurrentWeather;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Destination for weather records after they were shown in the chat.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn publish(&self, weather: &CurrentWeather) -> bool;
}

/// Publishes each record over its own short-lived broker connection.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    broker: String,
    port: u16,
    topic: String,
    timeout: Duration,
}

impl MqttPublisher {
    pub fn new(config: &Config) -> Self {
        Self {
            broker: config.mqtt_broker.clone(),
            port: config.mqtt_port,
            topic: config.mqtt_topic.clone(),
            timeout: config.upstream_timeout,
        }
    }

    /// Connects, publishes with QoS 1, waits for the PUBACK and disconnects.
    ///
    /// The event loop owns the socket, so returning early on any error drops
    /// the connection as well.
    pub async fn publish_payload<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let body = serde_json::to_vec(payload)?;

        let client_id = format!("weather-bridge-{}", uuid::Uuid::new_v4());
        let mut mqtt_options = MqttOptions::new(client_id, self.broker.as_str(), self.port);
        mqtt_options.set_keep_alive(KEEP_ALIVE);
        mqtt_options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        client
            .publish(self.topic.as_str(), QoS::AtLeastOnce, false, body)
            .await?;

        timeout(self.timeout, wait_for_puback(&mut eventloop))
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        client.disconnect().await?;
        let flushed = timeout(self.timeout, wait_for_disconnect(&mut eventloop)).await;
        if flushed.is_err() {
            debug!("Broker did not see a clean disconnect within {:?}", self.timeout);
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for MqttPublisher {
    async fn publish(&self, weather: &CurrentWeather) -> bool {
        let start = Instant::now();
        let result = self.publish_payload(weather).await;
        UPSTREAM_LATENCY_SECONDS
            .with_label_values(&["mqtt"])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                MQTT_PUBLISHED_TOTAL.inc();
                info!(
                    "Published weather for {} to {} on {}:{}",
                    weather.city, self.topic, self.broker, self.port
                );
                true
            }
            Err(e) => {
                warn!(
                    "Failed to publish to {} on {}:{}: {}",
                    self.topic, self.broker, self.port, e
                );
                UPSTREAM_FAILURES_TOTAL.with_label_values(&["mqtt"]).inc();
                false
            }
        }
    }
}

async fn wait_for_puback(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::PubAck(ack)) => {
                debug!("PUBACK received for packet {}", ack.pkid);
                return Ok(());
            }
            event => debug!("MQTT event: {:?}", event),
        }
    }
}

async fn wait_for_disconnect(eventloop: &mut EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => return,
            Ok(_) => {}
        }
    }
}
