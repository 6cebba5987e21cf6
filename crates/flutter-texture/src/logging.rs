//! Process-wide tracing setup.

use once_cell::sync::OnceCell;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV_VAR: &str = "TEXTURE_INTERFACE_LOG";

/// Install the global subscriber once. Later calls are no-ops, as is the
/// case where the host process already installed one of its own.
pub fn init() {
    static INSTALLED: OnceCell<()> = OnceCell::new();
    INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .try_init();
        debug!("tracing installed (filter from {LOG_ENV_VAR})");
    });
}
