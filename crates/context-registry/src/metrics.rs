use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref REGISTRY_CONTEXTS_TOTAL: IntGauge = IntGauge::new(
        "webpilot_registry_contexts_total",
        "Open browser contexts currently tracked"
    )
    .unwrap();
    static ref REGISTRY_SWITCHES_TOTAL: IntCounter = IntCounter::new(
        "webpilot_registry_switches_total",
        "Context switches performed"
    )
    .unwrap();
    static ref REGISTRY_SWITCH_RACES_TOTAL: IntCounter = IntCounter::new(
        "webpilot_registry_switch_races_total",
        "Waits for a new context that timed out"
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register registry metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, REGISTRY_CONTEXTS_TOTAL.clone());
    register(registry, REGISTRY_SWITCHES_TOTAL.clone());
    register(registry, REGISTRY_SWITCH_RACES_TOTAL.clone());
}

pub fn set_context_count(count: usize) {
    REGISTRY_CONTEXTS_TOTAL.set(count as i64);
}

pub fn record_switch() {
    REGISTRY_SWITCHES_TOTAL.inc();
}

pub fn record_switch_race() {
    REGISTRY_SWITCH_RACES_TOTAL.inc();
}
