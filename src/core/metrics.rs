use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_exam_submitted(category: &str, score: u32, total: u32) {
    metrics::counter!("exams_submitted_total", "category" => category.to_string()).increment(1);
    if total > 0 {
        metrics::histogram!("exam_score_ratio").record(f64::from(score) / f64::from(total));
    }
}

pub(crate) fn record_llm_request(provider: &'static str, outcome: &'static str, latency: Duration) {
    metrics::counter!("llm_requests_total", "provider" => provider, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("llm_request_duration_seconds", "provider" => provider)
        .record(latency.as_secs_f64());
}

pub(crate) fn set_active_sessions(count: usize) {
    metrics::gauge!("sessions_active").set(count as f64);
}
