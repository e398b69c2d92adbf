use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub const SUBMISSIONS_TOTAL: &str = "assessment_submissions_total";
pub const CODE_RUNS_TOTAL: &str = "assessment_code_runs_total";
pub const AUTOSAVES_TOTAL: &str = "assessment_autosaves_total";
pub const INTEGRITY_EVENTS_TOTAL: &str = "assessment_integrity_events_total";
pub const DROPPED_WRITES_TOTAL: &str = "assessment_dropped_writes_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
