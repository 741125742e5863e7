//! Typed reel events
//!
//! Reels publish these over a channel; the spin coordinator is the usual
//! consumer. Renderers read positions directly and never need them.

use serde::{Deserialize, Serialize};

use crate::state::ReelState;

/// A reel finished its stop cycle (or refused a stop it could not honor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelStoppedEvent {
    pub reel_index: usize,
}

/// A reel's lifecycle state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangedEvent {
    pub reel_index: usize,
    pub old: ReelState,
    pub new: ReelState,
}

/// Everything a reel reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReelEvent {
    Stopped(ReelStoppedEvent),
    StateChanged(StateChangedEvent),
}

impl ReelEvent {
    pub fn reel_index(&self) -> usize {
        match self {
            ReelEvent::Stopped(e) => e.reel_index,
            ReelEvent::StateChanged(e) => e.reel_index,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ReelEvent::Stopped(_) => "reel_stopped",
            ReelEvent::StateChanged(_) => "state_changed",
        }
    }
}
