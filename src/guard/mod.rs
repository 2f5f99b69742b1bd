//! Route guards: pure decisions over a session snapshot.
//!
//! DESIGN
//! ======
//! A guard never reads the platform directly. It is a function of the
//! current [`Session`], the route's [`Requirement`] and (for public-only
//! pages) the remembered return-to location. Precedence is fixed:
//! - an unsettled session always yields `Loading`, before any redirect;
//! - a missing identity goes to login before any authorization check;
//! - a suspended or blocked account goes to the restricted page, never to
//!   the generic unauthorized page and never to the requested content.
//!
//! [`GuardMachine`] tracks one guarded route instance across session
//! updates, and [`navigator::Navigator`] strings guards together into a
//! headless router.

pub mod machine;
pub mod navigator;
pub mod return_to;
pub mod routes;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use tracing::debug;

use crate::identity::{AccountStatus, Identity, Permission};
use crate::session::Session;
pub use machine::{GuardMachine, GuardPhase};
pub use return_to::sanitize_return_to;
pub use routes::{Access, Route, RouteTable};

// =============================================================================
// REQUIREMENT
// =============================================================================

/// Authorization a restricted route demands.
///
/// An empty list places no constraint on that axis. A non-empty `statuses`
/// list must contain the identity's status; a non-empty `permissions` list
/// must share at least one tag with the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement {
    pub statuses: Vec<AccountStatus>,
    pub permissions: Vec<Permission>,
}

impl Requirement {
    /// Any signed-in identity.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_statuses(statuses: &[AccountStatus]) -> Self {
        Self { statuses: statuses.to_vec(), permissions: Vec::new() }
    }

    #[must_use]
    pub fn active() -> Self {
        Self::with_statuses(&[AccountStatus::Active])
    }

    #[must_use]
    pub fn with_any_permission(mut self, permissions: &[Permission]) -> Self {
        self.permissions = permissions.to_vec();
        self
    }

    #[must_use]
    pub fn is_satisfied_by(&self, identity: &Identity) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&identity.status);
        let permission_ok = self.permissions.is_empty() || identity.has_any_permission(&self.permissions);
        status_ok && permission_ok
    }
}

// =============================================================================
// DECISION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    RedirectToLogin { return_to: String },
    RedirectToUnauthorized,
    RedirectToRestricted,
    RedirectAway { to: String },
    Render,
}

impl GuardDecision {
    /// Where a redirect decision sends the user.
    #[must_use]
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::RedirectToLogin { .. } => Some(routes::LOGIN),
            Self::RedirectToUnauthorized => Some(routes::UNAUTHORIZED),
            Self::RedirectToRestricted => Some(routes::RESTRICTED),
            Self::RedirectAway { to } => Some(to),
            Self::Loading | Self::Render => None,
        }
    }
}

/// Guard for pages that need a signed-in, authorized identity.
#[must_use]
pub fn restricted_access(session: &Session, requirement: &Requirement, requested: &str) -> GuardDecision {
    if !session.is_settled() {
        debug!(requested, loading = ?session.loading, "guard: session not settled");
        return GuardDecision::Loading;
    }
    let Some(identity) = &session.identity else {
        debug!(requested, "guard: anonymous visit, redirecting to login");
        return GuardDecision::RedirectToLogin { return_to: requested.to_owned() };
    };

    if identity.status.is_locked() {
        debug!(requested, user_id = %identity.id, status = %identity.status, "guard: account locked");
        return GuardDecision::RedirectToRestricted;
    }
    if !requirement.is_satisfied_by(identity) {
        debug!(
            requested,
            user_id = %identity.id,
            status = %identity.status,
            ?requirement,
            "guard: requirement not met"
        );
        return GuardDecision::RedirectToUnauthorized;
    }

    debug!(requested, user_id = %identity.id, "guard: render");
    GuardDecision::Render
}

/// Guard for login/registration pages, which a signed-in user should leave.
#[must_use]
pub fn public_only(session: &Session, return_to: Option<&str>, routes: &RouteTable) -> GuardDecision {
    if !session.is_settled() {
        debug!(loading = ?session.loading, "public guard: session not settled");
        return GuardDecision::Loading;
    }
    if session.identity.is_none() {
        debug!("public guard: render");
        return GuardDecision::Render;
    }

    let to = return_to
        .and_then(|candidate| sanitize_return_to(candidate, routes))
        .unwrap_or_else(|| routes::HOME.to_owned());
    debug!(%to, remembered = ?return_to, "public guard: signed in, redirecting away");
    GuardDecision::RedirectAway { to }
}
