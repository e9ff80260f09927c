use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};

// Handled template.execute requests by reply phase
pub static REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "plugin_requests_total",
        "The total number of template.execute requests handled by the plugin",
        &[
            "service", // Service name, "unknown" before the input was parsed
            "action",  // validate or execute
            "phase",   // Succeeded, Running, Error or Rejected
        ]
    )
    .unwrap()
});

// Executions currently held by the tracker
pub static TRACKED_EXECUTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "plugin_tracked_executions",
        "The number of workflow executions currently tracked by the plugin"
    )
    .unwrap()
});

pub fn record_request(service: &str, action: &str, phase: &str) {
    REQUESTS.with_label_values(&[service, action, phase]).inc();
}

pub fn set_tracked_executions(count: usize) {
    TRACKED_EXECUTIONS.set(i64::try_from(count).unwrap_or(i64::MAX));
}
