//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds trait objects rather than concrete clients so route tests can swap
//! in the in-memory platform and reset backend.

use std::sync::Arc;

use crate::maintenance::ResetBackend;
use crate::platform::IdentityProvider;

/// Clone is required by Axum; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Resolves caller bearer tokens to account ids.
    pub identity: Arc<dyn IdentityProvider>,
    pub reset: Arc<dyn ResetBackend>,
}

impl AppState {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, reset: Arc<dyn ResetBackend>) -> Self {
        Self { identity, reset }
    }
}
