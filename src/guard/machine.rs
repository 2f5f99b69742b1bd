//! Per-route guard state machine.
//!
//! `Unevaluated → Loading → {Redirected | Rendered}`. Terminal phases are
//! sticky for the session snapshot that produced them. The machine restarts
//! only when the session leaves the settled state, or when a newer settled
//! snapshot appears (a transition the observer missed, such as a remote
//! sign-out that settles in one step).

#[cfg(test)]
#[path = "machine_test.rs"]
mod tests;

use tracing::debug;

use super::GuardDecision;
use crate::session::Session;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GuardPhase {
    #[default]
    Unevaluated,
    Loading,
    /// Holds the redirect decision that ended the machine.
    Redirected(GuardDecision),
    Rendered,
}

impl GuardPhase {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redirected(_) | Self::Rendered)
    }
}

#[derive(Debug, Default)]
pub struct GuardMachine {
    phase: GuardPhase,
    /// Epoch of the settled snapshot that produced the terminal phase.
    decided_at: Option<u64>,
}

impl GuardMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> &GuardPhase {
        &self.phase
    }

    /// Feed the latest session and the guard's decision for it. Returns
    /// `true` when the phase changed.
    pub fn observe(&mut self, session: &Session, decision: GuardDecision) -> bool {
        if self.phase.is_terminal() {
            let stale = !session.is_settled() || self.decided_at != Some(session.epoch);
            if !stale {
                return false;
            }
            debug!(epoch = session.epoch, from = ?self.phase, "guard machine restarting");
            self.decided_at = None;
        }

        let next = match decision {
            GuardDecision::Loading => GuardPhase::Loading,
            GuardDecision::Render => GuardPhase::Rendered,
            redirect => GuardPhase::Redirected(redirect),
        };
        if next.is_terminal() {
            self.decided_at = Some(session.epoch);
        }

        let changed = next != self.phase;
        self.phase = next;
        changed
    }
}
