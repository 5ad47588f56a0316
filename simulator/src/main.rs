mod update;

use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use update::{build_update, random_command};

/// Posts synthetic Telegram updates to a running weather bridge.
#[derive(Debug, Parser)]
#[command(name = "webhook-simulator", version)]
struct Args {
    /// Bridge webhook URL.
    #[arg(long, env = "BRIDGE_URL", default_value = "http://localhost:5001/webhook")]
    url: String,

    /// Bot username the commands are addressed to.
    #[arg(long, env = "BOT_USERNAME", default_value = "weatherbot")]
    bot: String,

    /// Chat id placed in every update.
    #[arg(long, env = "CHAT_ID", default_value_t = 1, allow_hyphen_values = true)]
    chat_id: i64,

    /// Updates per second.
    #[arg(long, env = "RATE", default_value_t = 1)]
    rate: u64,

    /// Total updates to send.
    #[arg(long, env = "COUNT", default_value_t = 10)]
    count: u64,

    /// Also count what the bridge publishes on this topic.
    #[arg(long, env = "MQTT_TOPIC")]
    mqtt_topic: Option<String>,

    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    mqtt_broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    mqtt_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    anyhow::ensure!(args.rate > 0, "rate must be at least 1 update/s");

    info!("Starting webhook simulator");
    info!(
        "Target: {}, Bot: @{}, Rate: {} updates/s, Count: {}",
        args.url, args.bot, args.rate, args.count
    );

    let published = Arc::new(AtomicU64::new(0));
    if let Some(topic) = &args.mqtt_topic {
        watch_topic(&args, topic, published.clone()).await?;
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let bot = args.bot.trim_start_matches('@').to_lowercase();
    let interval = Duration::from_millis(1000 / args.rate);

    let mut rng = rand::thread_rng();
    let mut sent: HashMap<&'static str, u64> = HashMap::new();
    let mut failures = 0u64;

    for counter in 1..=args.count {
        let started = std::time::Instant::now();
        let (kind, text) = random_command(&mut rng, &bot);
        let update = build_update(counter, args.chat_id, text.clone());

        match http.post(&args.url).json(&update).send().await {
            Ok(response) if response.status().is_success() => {
                *sent.entry(kind.as_str()).or_default() += 1;
                info!("#{} {:?} -> {}", counter, text, response.status());
            }
            Ok(response) => {
                failures += 1;
                warn!("#{} {:?} -> unexpected status {}", counter, text, response.status());
            }
            Err(e) => {
                failures += 1;
                warn!("#{} {:?} failed: {}", counter, text, e);
            }
        }

        let elapsed = started.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        } else if elapsed > interval * 2 {
            warn!("Update took {:?}, target interval was {:?}", elapsed, interval);
        }
    }

    if args.mqtt_topic.is_some() {
        // Publishes trail the webhook acknowledgement.
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    info!("Done: {:?} acknowledged, {} failed", sent, failures);
    if args.mqtt_topic.is_some() {
        info!(
            "Broker messages seen: {} (expected {})",
            published.load(Ordering::Relaxed),
            sent.get("current").copied().unwrap_or_default()
        );
    }

    Ok(())
}

async fn watch_topic(args: &Args, topic: &str, published: Arc<AtomicU64>) -> anyhow::Result<()> {
    let client_id = format!("webhook-sim-{}", rand::random::<u32>());
    let mut mqtt_options = MqttOptions::new(client_id, args.mqtt_broker.as_str(), args.mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);
    client.subscribe(topic, QoS::AtLeastOnce).await?;

    tokio::spawn(async move {
        let _client = client;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    published.fetch_add(1, Ordering::Relaxed);
                    info!("Broker: {}", String::from_utf8_lossy(&publish.payload));
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT eventloop error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    info!("Watching {} on {}:{}", topic, args.mqtt_broker, args.mqtt_port);
    Ok(())
}
