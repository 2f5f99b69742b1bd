//! Database reset maintenance operation.
//!
//! SYSTEM CONTEXT
//! ==============
//! `POST /functions/v1/reset-db` (see `routes::maintenance`) calls
//! [`authorize_and_reset`]: the bearer token is resolved to an account by
//! the identity provider, the account's stored profile role must be
//! `admin`, and only then does the backend clear the fixed table list.
//!
//! The whole deletion runs in one transaction, so a failure part-way leaves
//! every table untouched. Admin profiles and the caller's own profile
//! survive the reset.

pub mod postgres;

#[cfg(test)]
pub mod test_helpers;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::platform::{IdentityProvider, PlatformError};

/// Tables cleared by a reset, children before parents. `profiles` is last.
pub const RESET_TABLES: [&str; 9] = [
    "paiements",
    "sinistres",
    "vignettes",
    "contrats",
    "vehicules",
    "contracts",
    "clients",
    "profiles_backup",
    PROFILES_TABLE,
];

pub const PROFILES_TABLE: &str = "profiles";

/// Stored role label required to run a reset.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReset {
    pub table: &'static str,
    pub deleted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub tables: Vec<TableReset>,
}

impl ResetReport {
    #[must_use]
    pub fn total_deleted(&self) -> u64 {
        self.tables.iter().map(|t| t.deleted).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("authorization header missing")]
    MissingToken,
    #[error("authentication failed")]
    InvalidToken,
    #[error("admin privileges required")]
    NotAdmin,
    #[error("identity provider unavailable: {0}")]
    Platform(PlatformError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage side of the reset.
#[async_trait::async_trait]
pub trait ResetBackend: Send + Sync {
    /// The `role` column of the account's profile, if the row exists.
    async fn stored_role(&self, user_id: Uuid) -> Result<Option<String>, ResetError>;

    /// Clear [`RESET_TABLES`] in order inside one transaction, keeping admin
    /// profiles and `caller`'s profile.
    async fn reset(&self, caller: Uuid) -> Result<ResetReport, ResetError>;
}

/// Authenticate the bearer token, require an admin caller, then reset.
///
/// # Errors
///
/// `MissingToken`/`InvalidToken` when the caller cannot be identified,
/// `NotAdmin` when their stored role is not `admin`, `Database` when the
/// deletion fails (nothing is deleted in that case).
pub async fn authorize_and_reset(
    identity: &dyn IdentityProvider,
    backend: &dyn ResetBackend,
    bearer: Option<&str>,
) -> Result<ResetReport, ResetError> {
    let token = bearer
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ResetError::MissingToken)?;

    let caller = identity
        .verify_access_token(token)
        .await
        .map_err(|e| match e {
            PlatformError::InvalidCredentials
            | PlatformError::NotSignedIn
            | PlatformError::Response { status: 401 | 403, .. } => ResetError::InvalidToken,
            other => ResetError::Platform(other),
        })?;

    let role = backend.stored_role(caller).await?;
    if role.as_deref() != Some(ADMIN_ROLE) {
        warn!(%caller, role = ?role, "reset refused: caller is not an admin");
        return Err(ResetError::NotAdmin);
    }

    info!(%caller, "database reset starting");
    let report = backend.reset(caller).await?;
    info!(%caller, deleted = report.total_deleted(), tables = report.tables.len(), "database reset complete");
    Ok(report)
}
