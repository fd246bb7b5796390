//! Rotation Streamer - stream session lifecycle coordination.
//!
//! This is the main library crate. It coordinates when capture, preview,
//! streaming and recording may be prepared, started, stopped and torn down
//! around an externally provided encode/transport engine.

pub mod commands;
pub mod connection;
pub mod engine;
pub mod notify;
pub mod session;
pub mod settings;
pub mod utils;

pub use commands::StreamerState;
pub use engine::{EngineEvent, EngineFacade};
pub use session::{SessionConfig, SessionCoordinator};
pub use settings::StreamerSettings;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over `default_filter`. Does nothing if a global
/// subscriber is already installed.
pub fn init_tracing(default_filter: &str) {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    match result {
        Ok(()) => tracing::info!("Starting Rotation Streamer v{}", env!("CARGO_PKG_VERSION")),
        Err(e) => tracing::debug!("Tracing already initialized: {}", e),
    }
}
