//! Route table for the agency portal.

use super::Requirement;
use crate::identity::{AccountStatus, Permission};

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const VERIFY_EMAIL: &str = "/verify-email";
pub const UNAUTHORIZED: &str = "/unauthorized";
pub const RESTRICTED: &str = "/account-restricted";

/// Which guard wraps a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Restricted(Requirement),
    /// Only for visitors without an identity (login, registration).
    PublicOnly,
    /// Informational pages rendered for everyone.
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The portal's pages and the authorization each demands.
    #[must_use]
    pub fn agency() -> Self {
        let signed_in = Requirement::with_statuses(&[AccountStatus::Pending, AccountStatus::Active]);
        let restricted = |path, requirement| Route { path, access: Access::Restricted(requirement) };
        let public = |path| Route { path, access: Access::PublicOnly };
        let open = |path| Route { path, access: Access::Open };

        Self::new(vec![
            restricted(HOME, signed_in.clone()),
            restricted(
                "/contracts",
                Requirement::active().with_any_permission(&[Permission::ManageContracts, Permission::ViewContracts]),
            ),
            restricted("/clients", Requirement::active().with_any_permission(&[Permission::ManageClients])),
            restricted(
                "/agents",
                Requirement::active().with_any_permission(&[Permission::ManageAgents, Permission::ManageSystem]),
            ),
            restricted("/settings", Requirement::active().with_any_permission(&[Permission::ManageSystem])),
            restricted("/profile", signed_in),
            public(LOGIN),
            public(REGISTER),
            public(VERIFY_EMAIL),
            open(UNAUTHORIZED),
            open(RESTRICTED),
        ])
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Match a location, ignoring any query string, fragment or trailing
    /// slash.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Option<&Route> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" if path.starts_with('/') => HOME,
            trimmed => trimmed,
        };
        self.routes.iter().find(|route| route.path == path)
    }
}
