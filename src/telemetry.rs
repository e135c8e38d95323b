use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured level. JSON output carries the
/// current span so decisions can be correlated across store and audit writes.
/// An invalid configured level is an error; a subscriber that is already
/// installed is kept.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_env_filter(rust_log.as_deref(), &observability.log_level)?;

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if observability.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    match installed {
        Ok(()) => tracing::debug!("Greenlight telemetry initialized"),
        Err(e) => tracing::debug!(error = %e, "Tracing subscriber already installed"),
    }
    Ok(())
}

/// Filter from `RUST_LOG` when it parses, otherwise from the configured level
fn build_env_filter(rust_log: Option<&str>, log_level: &str) -> Result<EnvFilter> {
    if let Some(filter) = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(log_level)
        .with_context(|| format!("Invalid observability.log_level {log_level:?}"))
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span wrapping one decision's read, write and audit append
pub fn create_decision_span(
    project_id: &str,
    role: &str,
    identity: &str,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "greenlight_decision",
        project.id = project_id,
        role = role,
        actor = identity,
        correlation.id = correlation_id,
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    // For structured logging, no explicit shutdown needed
    tracing::debug!("Greenlight telemetry shutdown complete");
}
