pub mod actions;
pub mod config;
pub mod errors;
pub mod prompt;
pub mod snapshot;
pub mod workbench;

pub use actions::dispatch::{ActionDriver, ActionOutcome, Command};
pub use actions::protocol::extract_actions;
pub use actions::types::UiAction;
pub use errors::{UiPilotError, UiPilotResult};
pub use snapshot::item::{Classification, Item, Snapshot};
pub use snapshot::serializer::ContextFormat;
pub use workbench::{Session, Workbench};

/// Installs the global tracing subscriber. Call once from the embedding shell.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
