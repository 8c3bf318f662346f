pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::config::SyncConfig;
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::events::{EventEmitter, SyncEvent};
pub use crate::core::install::{InstallReport, Orchestrator};

/// Install a fmt subscriber. `RUST_LOG` overrides the default filter;
/// calling it again (tests, embedding apps) is a no-op.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,interface_sync=debug")),
        )
        .try_init();
}
