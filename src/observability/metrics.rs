use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::OnceLock;
use tracing::info;

static METRICS_INSTANCE: OnceLock<Metrics> = OnceLock::new();

/// Process-wide metrics, created on first use.
pub fn get_metrics() -> &'static Metrics {
    METRICS_INSTANCE.get_or_init(|| {
        info!("Initializing Metrics ...");
        Metrics::new()
    })
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token source metrics
    pub token_fetch_total: IntCounterVec,
    pub token_fetch_duration: Histogram,

    // Cache metrics
    pub token_invalidations: IntCounter,

    // Client metrics
    pub auth_retries: IntCounter,
    pub synthesized_responses: IntCounterVec,

    // Runtime
    pub up: IntGauge,
}

impl Metrics {
    // metric names and labels are static, construction cannot fail
    fn new() -> Self {
        let registry = Registry::new_custom(Some("authagent".into()), None).expect("registry");

        let metrics = Self {
            token_fetch_total: IntCounterVec::new(Opts::new("token_fetch_total", "Token requests to the identity provider by outcome"), &["outcome"]).expect("token_fetch_total"),
            token_fetch_duration: Histogram::with_opts(HistogramOpts::new("token_fetch_duration_seconds", "Token request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).expect("token_fetch_duration_seconds"),

            token_invalidations: IntCounter::new("token_invalidations_total", "Cached tokens dropped after a rejected request").expect("token_invalidations_total"),

            auth_retries: IntCounter::new("auth_retries_total", "Requests redispatched with a refreshed token").expect("auth_retries_total"),
            synthesized_responses: IntCounterVec::new(Opts::new("synthesized_responses_total", "Error responses produced instead of a downstream answer"), &["status"]).expect("synthesized_responses_total"),

            up: IntGauge::new("up", "1 if service is healthy").expect("up"),

            registry,
        };

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_fetch_total.clone())).expect("register token_fetch_total");
        reg.register(Box::new(metrics.token_fetch_duration.clone())).expect("register token_fetch_duration_seconds");
        reg.register(Box::new(metrics.token_invalidations.clone())).expect("register token_invalidations_total");
        reg.register(Box::new(metrics.auth_retries.clone())).expect("register auth_retries_total");
        reg.register(Box::new(metrics.synthesized_responses.clone())).expect("register synthesized_responses_total");
        reg.register(Box::new(metrics.up.clone())).expect("register up");

        metrics
    }
}
