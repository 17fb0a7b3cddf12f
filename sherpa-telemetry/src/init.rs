//! Telemetry initialization

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

fn env_filter() -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(DEFAULT_FILTER)?),
    }
}

/// Initialize console logging.
///
/// Safe to call more than once; only the first call installs a subscriber.
///
/// # Arguments
/// * `service_name` - Name recorded in the startup event
///
/// # Example
/// ```
/// use sherpa_telemetry::init_telemetry;
/// init_telemetry("voice-practice").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = env_filter()?;

    INIT.call_once(|| {
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init();

        if installed.is_ok() {
            tracing::info!(service.name = service_name, "Telemetry initialized");
        }
    });

    Ok(())
}

/// Initialize JSON logging, one object per line.
///
/// Shares the once-guard with [`init_telemetry`].
///
/// # Example
/// ```
/// use sherpa_telemetry::init_json_telemetry;
/// init_json_telemetry("voice-practice").expect("Failed to initialize telemetry");
/// ```
pub fn init_json_telemetry(
    service_name: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = env_filter()?;

    INIT.call_once(|| {
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init();

        if installed.is_ok() {
            tracing::info!(service.name = service_name, format = "json", "Telemetry initialized");
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_telemetry("test").is_ok());
        assert!(init_telemetry("test").is_ok());
        assert!(init_json_telemetry("test").is_ok());
    }
}
