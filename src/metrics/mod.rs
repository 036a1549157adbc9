use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the order desk
// ============================================================================
//
// - Order status transitions (accepted, rejected)
// - COD verification actions
// - Bulk operation items
// - Backend request latency
// - Records dropped at the API boundary
//
// ============================================================================

/// Central metrics registry for the desk
pub struct Metrics {
    registry: Registry,

    pub order_transitions: IntCounterVec,
    pub order_transition_failures: IntCounterVec,
    pub cod_actions: IntCounterVec,
    pub bulk_items: IntCounterVec,
    pub api_request_duration: HistogramVec,
    pub records_quarantined: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions accepted by the backend"),
            &["from", "to"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_transition_failures = IntCounterVec::new(
            Opts::new("order_transition_failures_total", "Order status transitions that failed"),
            &["reason"],
        )?;
        registry.register(Box::new(order_transition_failures.clone()))?;

        let cod_actions = IntCounterVec::new(
            Opts::new("cod_actions_total", "COD verification actions by outcome"),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(cod_actions.clone()))?;

        let bulk_items = IntCounterVec::new(
            Opts::new("bulk_items_total", "Orders processed by bulk operations"),
            &["outcome"],
        )?;
        registry.register(Box::new(bulk_items.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new("api_request_duration_seconds", "Backend request duration")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["endpoint"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        let records_quarantined = IntCounter::new(
            "records_quarantined_total",
            "Order records dropped because they failed validation",
        )?;
        registry.register(Box::new(records_quarantined.clone()))?;

        Ok(Self {
            registry,
            order_transitions,
            order_transition_failures,
            cod_actions,
            bulk_items,
            api_request_duration,
            records_quarantined,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.order_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_transition_failure(&self, reason: &str) {
        self.order_transition_failures.with_label_values(&[reason]).inc();
    }

    pub fn record_cod_action(&self, action: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.cod_actions.with_label_values(&[action, outcome]).inc();
    }

    pub fn record_bulk_item(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.bulk_items.with_label_values(&[outcome]).inc();
    }

    pub fn observe_request(&self, endpoint: &str, duration_secs: f64) {
        self.api_request_duration
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn record_quarantined(&self, count: usize) {
        self.records_quarantined.inc_by(count as u64);
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
