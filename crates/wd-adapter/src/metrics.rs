use lazy_static::lazy_static;
use prometheus::{core::Collector, opts, IntCounterVec, Registry};
use tracing::error;

lazy_static! {
    static ref WD_COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        opts!(
            "webpilot_wd_commands_total",
            "WebDriver commands issued, grouped by command"
        ),
        &["command"]
    )
    .unwrap();
    static ref WD_COMMAND_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        opts!(
            "webpilot_wd_command_failures_total",
            "WebDriver command failures, grouped by command and error kind"
        ),
        &["command", "kind"]
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register adapter metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, WD_COMMANDS_TOTAL.clone());
    register(registry, WD_COMMAND_FAILURES_TOTAL.clone());
}

pub fn record_command(command: &str) {
    WD_COMMANDS_TOTAL.with_label_values(&[command]).inc();
}

pub fn record_failure(command: &str, kind: &str) {
    WD_COMMAND_FAILURES_TOTAL
        .with_label_values(&[command, kind])
        .inc();
}
