//! Console logging for processes embedding the listener.
//!
//! Environment-aware setup on the tracing ecosystem: log level comes from
//! `RUST_LOG` (default `info`), output goes to stdout with ANSI colors only
//! when attached to a TTY. Safe to call more than once; later calls keep the
//! already-installed subscriber.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let subscriber = tracing_subscriber::fmt()
            .with_target(true)
            .with_level(true)
            .with_ansi(use_ansi)
            .with_env_filter(filter);

        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
