//! UI shell command handlers
//!
//! This module contains the handlers the UI calls for button presses,
//! menu selections, surface callbacks and permission checks.

pub mod permissions;
pub mod session;

pub use session::{RecordToggle, StreamerState};
