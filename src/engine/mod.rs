//! Capture/encode/transport engine boundary
//!
//! The engine itself lives outside this crate; this module only defines
//! the capabilities the session coordinator relies on.

pub mod traits;

#[cfg(test)]
pub(crate) mod fake;

pub use traits::{
    engine_event_channel, AudioParams, EngineError, EngineEvent, EngineEventReceiver,
    EngineEventSender, EngineFacade, EngineResult, RecordStatus, SurfaceSize, VideoParams,
};
