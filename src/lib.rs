pub mod backend;
pub mod core;
pub mod domain;
pub mod runner;
pub mod schemas;
pub mod services;
pub mod session;
pub mod views;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, shutdown::shutdown_signal, telemetry};

/// Headless runner: one session from load to grade summary.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    crate::core::metrics::init(&settings)?;

    let args = runner::parse_args()?;
    let answers = runner::load_answers(&args.answers_path)?;
    let backend = runner::backend_from_settings(&settings)?;

    tracing::info!(
        test_id = %args.test_id,
        base_url = %settings.api().base_url,
        environment = %settings.runtime().environment.as_str(),
        "Assessment runner starting"
    );

    tokio::select! {
        result = runner::drive(&settings, backend, &args.test_id, answers) => {
            let summary = result?;
            println!("{summary}");
        }
        signal = shutdown_signal() => {
            tracing::warn!(
                test_id = %args.test_id,
                signal = signal.as_str(),
                "Session abandoned before submission"
            );
        }
    }

    if let Some(rendered) = crate::core::metrics::render() {
        tracing::debug!(metrics = %rendered, "Final metrics snapshot");
    }

    Ok(())
}
