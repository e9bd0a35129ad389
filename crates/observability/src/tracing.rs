//! Tracing/logging initialization.
//!
//! Operational events across the workspace are keyed by a `product_id`
//! field (the service, the sqlite store spans and the sweep all record
//! one), so output is JSON for field-level filtering rather than formatted
//! text.

use tracing_subscriber::EnvFilter;

/// Fallback directives when `RUST_LOG` is unset: the workspace at `info`,
/// with sqlx quieted so routine store calls do not flood the log with
/// statement-level events.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Initialize tracing/logging for the process with the default directives.
///
/// `RUST_LOG` takes precedence. Safe to call multiple times (subsequent
/// calls are no-ops), so test setups can call it unconditionally.
pub fn init() {
    init_with_directives(DEFAULT_DIRECTIVES);
}

/// Initialize with explicit fallback directives.
pub fn init_with_directives(directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .try_init();
}
