//! Hosted platform seams: identity provider, profile records, blob storage.
//!
//! DESIGN
//! ======
//! The portal owns no auth or storage of its own. Everything it needs from the
//! hosted backend is expressed as three async traits so the session store,
//! profile operations and maintenance endpoint can be driven by the real HTTP
//! adapter (`supabase`) or by in-memory fakes in tests.
//!
//! Platform-originated session changes (sign-in elsewhere, token refresh,
//! sign-out elsewhere) are pushed through a `tokio::sync::broadcast` channel
//! obtained from [`IdentityProvider::subscribe`].

pub mod error;
pub mod supabase;

#[cfg(test)]
pub mod test_helpers;

use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::identity::ProfileRecord;
pub use error::PlatformError;

// =============================================================================
// CREDENTIAL + EVENTS
// =============================================================================

/// An authenticated platform session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Session change pushed by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: Uuid },
    TokenRefreshed { user_id: Uuid },
    UserUpdated { user_id: Uuid },
    SignedOut,
}

/// Capacity of the auth event channel. Slow subscribers that fall behind
/// receive `Lagged` and resynchronise with a fresh fetch.
pub const AUTH_EVENT_CAPACITY: usize = 16;

/// Account creation payload; `metadata` lands in the auth user's metadata.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub metadata: serde_json::Value,
}

// =============================================================================
// TRAITS
// =============================================================================

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current credential, or `None` when nobody is signed in.
    async fn current_credential(&self) -> Result<Option<Credential>, PlatformError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credential, PlatformError>;

    /// Create the auth account, returning its stable id.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Uuid, PlatformError>;

    async fn sign_out(&self) -> Result<(), PlatformError>;

    /// Exchange the refresh token for a new access token.
    async fn refresh_session(&self) -> Result<Credential, PlatformError>;

    /// Resolve a caller-supplied bearer token to its account id.
    async fn verify_access_token(&self, token: &str) -> Result<Uuid, PlatformError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// CRUD over the `profiles` table, keyed by the auth account id.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, id: Uuid) -> Result<Option<ProfileRecord>, PlatformError>;

    async fn insert_profile(&self, record: &ProfileRecord) -> Result<(), PlatformError>;

    /// Apply the present fields of `patch` to the row with `id`.
    async fn update_profile(&self, id: Uuid, patch: &ProfileRecord) -> Result<(), PlatformError>;

    async fn count_profiles(&self) -> Result<u64, PlatformError>;
}

/// Object storage used for avatar images.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), PlatformError>;

    fn public_url(&self, path: &str) -> String;
}
