mod alerts;
mod config;

use alerts::AlertLayer;
use anyhow::Result;
use config::ObservabilityConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber: local-time fmt output filtered by
/// `RUST_LOG` (default `info`), plus the optional Discord alert sink.
///
/// Must be called from inside a tokio runtime.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = config.alerts.as_ref().map(|sink| {
        AlertLayer::spawn(sink.webhook_url.clone(), config.labels.clone(), sink.min_level)
            .with_filter(LevelFilter::from_level(sink.min_level))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(component = %config.labels.component, %warning, "observability: config warning");
    }

    info!(
        service = %config.labels.service,
        stage = %config.labels.stage,
        component = %config.labels.component,
        alerts_enabled = config.alerts.is_some(),
        "observability: initialized"
    );

    Ok(())
}
