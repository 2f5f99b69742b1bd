//! Validation of the remembered "return-to" location.
//!
//! The location travels through navigation state and may be stale or
//! attacker-influenced. Only in-app absolute paths that resolve to a
//! restricted page in the route table are honoured; login and other
//! public-only pages are refused so a redirect can never loop back.

#[cfg(test)]
#[path = "return_to_test.rs"]
mod tests;

use super::routes::{Access, RouteTable};

/// Returns the location if it is safe to redirect to, else `None`.
#[must_use]
pub fn sanitize_return_to(candidate: &str, routes: &RouteTable) -> Option<String> {
    if !candidate.starts_with('/') || candidate.starts_with("//") {
        return None;
    }
    if candidate.contains('\\') || candidate.contains("://") || candidate.chars().any(char::is_control) {
        return None;
    }

    match routes.resolve(candidate)?.access {
        Access::Restricted(_) => Some(candidate.to_owned()),
        Access::PublicOnly | Access::Open => None,
    }
}
