//! Per-reel lifecycle state machine
//!
//! ```text
//!  Idle ──start_spin──► Spinning ──start_stopping──► Stopping ──set_result──► Result
//!   ▲                                                                          │
//!   │                        start_spin (new spin)                             │
//!   │   ◄──────────────────────────────────────────────────────────────────────┘
//!   └── reset (from any state)
//! ```
//!
//! Illegal requests are no-ops that return `false`; callers check the
//! predicates first.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::event::StateChangedEvent;

/// Reel lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReelState {
    #[default]
    Idle,
    Spinning,
    Stopping,
    Result,
}

impl ReelState {
    pub fn name(&self) -> &'static str {
        match self {
            ReelState::Idle => "idle",
            ReelState::Spinning => "spinning",
            ReelState::Stopping => "stopping",
            ReelState::Result => "result",
        }
    }
}

/// Observer failure; logged, never propagated into the transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    #[error("Event receiver disconnected")]
    Disconnected,

    #[error("Observer rejected event: {0}")]
    Rejected(String),
}

/// Transition callback
pub type StateObserver = Box<dyn FnMut(&StateChangedEvent) -> Result<(), ObserverError> + Send>;

/// Four-state reel lifecycle
pub struct ReelStateMachine {
    reel_index: usize,
    state: ReelState,
    observers: Vec<StateObserver>,
}

impl ReelStateMachine {
    pub fn new(reel_index: usize) -> Self {
        Self {
            reel_index,
            state: ReelState::Idle,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: StateObserver) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> ReelState {
        self.state
    }

    /// Idle or showing a result
    pub fn can_spin(&self) -> bool {
        matches!(self.state, ReelState::Idle | ReelState::Result)
    }

    pub fn is_spinning(&self) -> bool {
        self.state == ReelState::Spinning
    }

    pub fn is_stopping(&self) -> bool {
        self.state == ReelState::Stopping
    }

    pub fn has_result(&self) -> bool {
        self.state == ReelState::Result
    }

    pub fn is_idle(&self) -> bool {
        self.state == ReelState::Idle
    }

    /// Idle/Result → Spinning
    pub fn start_spin(&mut self) -> bool {
        if !self.can_spin() {
            log::debug!(
                "Reel {}: start_spin ignored in {}",
                self.reel_index,
                self.state.name()
            );
            return false;
        }
        self.transition(ReelState::Spinning);
        true
    }

    /// Spinning → Stopping
    pub fn start_stopping(&mut self) -> bool {
        if !self.is_spinning() {
            log::debug!(
                "Reel {}: start_stopping ignored in {}",
                self.reel_index,
                self.state.name()
            );
            return false;
        }
        self.transition(ReelState::Stopping);
        true
    }

    /// Stopping → Result
    pub fn set_result(&mut self) -> bool {
        if !self.is_stopping() {
            log::debug!(
                "Reel {}: set_result ignored in {}",
                self.reel_index,
                self.state.name()
            );
            return false;
        }
        self.transition(ReelState::Result);
        true
    }

    /// Any state → Idle. Observers only hear about actual changes.
    pub fn reset(&mut self) {
        if self.state != ReelState::Idle {
            self.transition(ReelState::Idle);
        }
    }

    fn transition(&mut self, new: ReelState) {
        let event = StateChangedEvent {
            reel_index: self.reel_index,
            old: self.state,
            new,
        };
        self.state = new;

        for observer in &mut self.observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!(
                    "Reel {}: observer failed on {} -> {}: {}",
                    self.reel_index,
                    event.old.name(),
                    event.new.name(),
                    e
                ),
                Err(_) => log::error!(
                    "Reel {}: observer panicked on {} -> {}",
                    self.reel_index,
                    event.old.name(),
                    event.new.name()
                ),
            }
        }
    }
}

impl std::fmt::Debug for ReelStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelStateMachine")
            .field("reel_index", &self.reel_index)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}
