//! Stream session lifecycle
//!
//! This module implements the session state machine:
//! - SessionConfig describing one prepare cycle
//! - SessionCoordinator owning the engine and serializing transitions
//! - SurfaceReadinessTracker gating preview on the output surface

pub mod config;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod surface;

pub use config::{Orientation, Rotation, SessionConfig};
pub use coordinator::{CoordinatorOptions, SessionCoordinator, SessionEvent, StartTarget};
pub use error::{ConfigError, SessionError, SessionResult, StateError};
pub use state::{LifecycleState, Phase, SubState};
pub use surface::SurfaceReadinessTracker;
