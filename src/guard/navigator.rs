//! Headless router: resolves a location through the route table, applies the
//! matching guard and follows redirects until a page renders.

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;

use tracing::{debug, info};

use super::machine::{GuardMachine, GuardPhase};
use super::routes::{self, Access, RouteTable};
use super::{GuardDecision, public_only, restricted_access};
use crate::session::{LoadingState, Session, SessionStore};

/// Redirect hops allowed before a navigation is declared a loop.
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches {0}")]
    UnknownRoute(String),
    #[error("redirect loop: {}", .0.join(" -> "))]
    RedirectLoop(Vec<String>),
}

/// Result of a navigation: where the user ended up and how they got there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub location: String,
    pub decision: GuardDecision,
    /// Every location visited, starting with the requested one.
    pub trail: Vec<String>,
}

pub struct Navigator {
    store: SessionStore,
    routes: RouteTable,
    location: String,
    return_to: Option<String>,
    machine: GuardMachine,
}

impl Navigator {
    #[must_use]
    pub fn new(store: SessionStore, routes: RouteTable) -> Self {
        Self {
            store,
            routes,
            location: routes::HOME.to_owned(),
            return_to: None,
            machine: GuardMachine::new(),
        }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Location remembered by the last login redirect.
    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    #[must_use]
    pub fn phase(&self) -> &GuardPhase {
        self.machine.phase()
    }

    /// Guard decision for `location` under `session`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRoute` when the location matches no route.
    pub fn decide(&self, session: &Session, location: &str) -> Result<GuardDecision, NavigationError> {
        let route = self
            .routes
            .resolve(location)
            .ok_or_else(|| NavigationError::UnknownRoute(location.to_owned()))?;
        Ok(match &route.access {
            Access::Restricted(requirement) => restricted_access(session, requirement, location),
            Access::PublicOnly => public_only(session, self.return_to.as_deref(), &self.routes),
            Access::Open => GuardDecision::Render,
        })
    }

    /// Navigate to `location`, waiting for the session to settle first.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRoute` for unmatched locations and `RedirectLoop`
    /// when redirects do not converge.
    pub async fn navigate(&mut self, location: &str) -> Result<Navigation, NavigationError> {
        if self.store.session().loading == LoadingState::Uninitialized {
            self.store.fetch_user().await;
        }
        let session = self.store.settled().await;

        let mut trail = Vec::new();
        let mut target = location.to_owned();
        loop {
            trail.push(target.clone());
            let decision = self.decide(&session, &target)?;
            match &decision {
                GuardDecision::RedirectToLogin { return_to } => self.return_to = Some(return_to.clone()),
                GuardDecision::RedirectAway { .. } => self.return_to = None,
                _ => {}
            }

            let Some(next) = decision.redirect_path().map(str::to_owned) else {
                info!(requested = location, %target, hops = trail.len() - 1, "navigation settled");
                self.location.clone_from(&target);
                self.machine = GuardMachine::new();
                self.machine.observe(&session, decision.clone());
                return Ok(Navigation { location: target, decision, trail });
            };
            if trail.len() > MAX_REDIRECTS {
                return Err(NavigationError::RedirectLoop(trail));
            }
            debug!(from = %target, to = %next, "following guard redirect");
            target = next;
        }
    }

    /// Re-check the current location against the latest settled session,
    /// moving on if its guard now redirects. Returns `None` when nothing
    /// changed.
    ///
    /// # Errors
    ///
    /// Propagates navigation errors from the follow-up navigation.
    pub async fn reevaluate(&mut self) -> Result<Option<Navigation>, NavigationError> {
        let session = self.store.settled().await;
        let decision = self.decide(&session, &self.location)?;
        if !self.machine.observe(&session, decision) {
            return Ok(None);
        }
        match self.machine.phase() {
            GuardPhase::Redirected(_) | GuardPhase::Rendered => {
                let location = self.location.clone();
                self.navigate(&location).await.map(Some)
            }
            GuardPhase::Unevaluated | GuardPhase::Loading => Ok(None),
        }
    }
}
