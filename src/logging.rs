use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn,mystery=info";

static INIT: Once = Once::new();

/// Installs the global fmt subscriber. Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let result = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .try_init();
        if let Err(e) = result {
            // Another subscriber (a test harness, an embedding app) got there first.
            tracing::debug!(error = %e, "Global subscriber already set");
        }
    });
}
