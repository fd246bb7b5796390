//! Session lifecycle state
//!
//! Defines the lifecycle state machine owned by the coordinator.

use serde::{Deserialize, Serialize};

/// Coarse lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing prepared, or the last prepare failed
    Idle,
    /// Engine prepare in flight
    Preparing,
    /// Engine prepared; sub-states may be activated
    Ready,
    /// Torn down; terminal
    Released,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Idle
    }
}

/// An independently activatable output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubState {
    Preview,
    Stream,
    Record,
}

impl SubState {
    pub const ALL: [SubState; 3] = [SubState::Preview, SubState::Stream, SubState::Record];
}

impl std::fmt::Display for SubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubState::Preview => "preview",
            SubState::Stream => "stream",
            SubState::Record => "record",
        };
        f.write_str(name)
    }
}

/// Snapshot of the coordinator's lifecycle.
///
/// The preview/stream/record flags are only ever set while the phase is
/// [`Phase::Ready`]; every other phase has all three cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleState {
    pub phase: Phase,
    pub previewing: bool,
    pub streaming: bool,
    pub recording: bool,
}

impl LifecycleState {
    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn is_released(&self) -> bool {
        self.phase == Phase::Released
    }

    pub fn is_active(&self, kind: SubState) -> bool {
        match kind {
            SubState::Preview => self.previewing,
            SubState::Stream => self.streaming,
            SubState::Record => self.recording,
        }
    }

    pub fn any_active(&self) -> bool {
        self.previewing || self.streaming || self.recording
    }

    pub(crate) fn set_active(&mut self, kind: SubState, active: bool) {
        match kind {
            SubState::Preview => self.previewing = active,
            SubState::Stream => self.streaming = active,
            SubState::Record => self.recording = active,
        }
    }

    /// Move to `phase`, clearing every sub-state unless the phase is Ready
    pub(crate) fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        if phase != Phase::Ready {
            self.previewing = false;
            self.streaming = false;
            self.recording = false;
        }
    }

    /// Sub-states currently active, in teardown order
    pub fn active(&self) -> Vec<SubState> {
        SubState::ALL
            .into_iter()
            .filter(|kind| self.is_active(*kind))
            .collect()
    }
}
