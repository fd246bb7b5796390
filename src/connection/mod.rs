//! Stream connection handling
//!
//! - ConnectionRetryPolicy deciding between retry and give-up
//! - ConnectionMonitor consuming engine events on its own task

pub mod monitor;
pub mod retry;

pub use monitor::ConnectionMonitor;
pub use retry::{ConnectionRetryPolicy, ConnectionStatus, RetryDecision};
