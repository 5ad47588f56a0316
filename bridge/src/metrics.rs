use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref WEBHOOK_UPDATES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_webhook_updates_total",
        "Total webhook updates received"
    ))
    .unwrap();
    pub static ref COMMANDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("bridge_commands_total", "Commands classified, by kind"),
        &["kind"]
    )
    .unwrap();
    pub static ref UPSTREAM_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "bridge_upstream_failures_total",
            "Failed calls to external services, by component"
        ),
        &["component"]
    )
    .unwrap();
    pub static ref MQTT_PUBLISHED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_mqtt_published_total",
        "Weather records acknowledged by the broker"
    ))
    .unwrap();
    pub static ref UPSTREAM_LATENCY_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bridge_upstream_latency_seconds",
            "Time spent waiting on external services"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["component"]
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(WEBHOOK_UPDATES_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(COMMANDS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(UPSTREAM_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(MQTT_PUBLISHED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(UPSTREAM_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
