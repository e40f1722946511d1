use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub lifecycle_transitions_total: IntCounterVec,
    pub tracking_events_total: IntCounter,
    pub payments_total: IntCounter,
    pub riders_in_delivery: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let lifecycle_transitions_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_transitions_total",
                "Parcel lifecycle transitions by target stage",
            ),
            &["transition"],
        )
        .expect("valid lifecycle_transitions_total metric");

        let tracking_events_total =
            IntCounter::new("tracking_events_total", "Tracking events appended")
                .expect("valid tracking_events_total metric");

        let payments_total = IntCounter::new("payments_total", "Payments recorded in the ledger")
            .expect("valid payments_total metric");

        let riders_in_delivery =
            IntGauge::new("riders_in_delivery", "Riders currently carrying a parcel")
                .expect("valid riders_in_delivery metric");

        registry
            .register(Box::new(lifecycle_transitions_total.clone()))
            .expect("register lifecycle_transitions_total");
        registry
            .register(Box::new(tracking_events_total.clone()))
            .expect("register tracking_events_total");
        registry
            .register(Box::new(payments_total.clone()))
            .expect("register payments_total");
        registry
            .register(Box::new(riders_in_delivery.clone()))
            .expect("register riders_in_delivery");

        Self {
            registry,
            lifecycle_transitions_total,
            tracking_events_total,
            payments_total,
            riders_in_delivery,
        }
    }

    pub fn record_transition(&self, transition: &str) {
        self.lifecycle_transitions_total
            .with_label_values(&[transition])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn transitions_are_labelled_by_stage() {
        let metrics = Metrics::new();
        metrics.record_transition("delivered");
        metrics.record_transition("delivered");

        let text = metrics.encode().unwrap();
        assert!(text.contains("lifecycle_transitions_total{transition=\"delivered\"} 2"));
    }
}
