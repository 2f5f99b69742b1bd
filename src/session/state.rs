//! Observable session snapshot.

use serde::Serialize;

use crate::identity::Identity;

/// Tri-state load progress. Guards make no redirect decision until `Settled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingState {
    #[default]
    Uninitialized,
    Loading,
    Settled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Present iff a validated, authenticated profile is loaded.
    pub identity: Option<Identity>,
    pub loading: LoadingState,
    /// Diagnostic from the last failed fetch, if any.
    pub last_error: Option<String>,
    /// Request token of the transition that produced this snapshot.
    pub epoch: u64,
}

impl Session {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.loading == LoadingState::Settled
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub(crate) fn settled(identity: Option<Identity>, last_error: Option<String>, epoch: u64) -> Self {
        Self { identity, loading: LoadingState::Settled, last_error, epoch }
    }
}
