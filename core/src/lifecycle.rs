// Session lifecycle state machine
//
// Uninitialized -> Initialized -> Started -> Initialized (stop);
// destroySession returns any phase to Uninitialized. The phase advances
// on `initialize` success and otherwise only through engine events, so
// it cannot drift ahead of what the engine has actually confirmed.

use parking_lot::RwLock;

use crate::error::{Failure, FailureReason};
use crate::event::EngineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Started,
}

/// Phase tracker owned by the bridge. This is the one piece of session
/// state the layer keeps for itself: just enough to fast-fail commands
/// that must never reach an uninitialized engine.
#[derive(Debug)]
pub struct Lifecycle {
    phase: RwLock<Phase>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: RwLock::new(Phase::Uninitialized),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    /// Guard for every command that may not run before `initialize`.
    pub fn require_initialized(&self) -> Result<(), Failure> {
        match self.phase() {
            Phase::Uninitialized => Err(Failure::new(FailureReason::NotInitialized)),
            Phase::Initialized | Phase::Started => Ok(()),
        }
    }

    /// Admission check for `initialize` itself. Policy: strict — one
    /// live instance per session, a second call fails fast.
    pub fn begin_initialize(&self) -> Result<(), Failure> {
        match self.phase() {
            Phase::Uninitialized => Ok(()),
            Phase::Initialized | Phase::Started => {
                Err(Failure::new(FailureReason::AlreadyInstantiated))
            }
        }
    }

    /// Record a successful `initialize`.
    pub fn note_initialized(&self) {
        let mut phase = self.phase.write();
        tracing::debug!(from = ?*phase, "lifecycle -> Initialized");
        *phase = Phase::Initialized;
    }

    /// Advance the phase from an engine event. Only the lifecycle events
    /// move it; everything else passes through untouched.
    pub fn observe(&self, event: &EngineEvent) {
        let next = match event {
            EngineEvent::Started { .. } => Some(Phase::Started),
            EngineEvent::Stopped => Some(Phase::Initialized),
            EngineEvent::SessionDestroyed => Some(Phase::Uninitialized),
            _ => None,
        };
        if let Some(next) = next {
            let mut phase = self.phase.write();
            if *phase != next {
                tracing::debug!(from = ?*phase, to = ?next, "lifecycle transition");
                *phase = next;
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
