//! Identity model for the signed-in agency user.
//!
//! DESIGN
//! ======
//! Two independent axes drive every access decision:
//! - `AccountStatus`: where the account is in its lifecycle
//!   (pending review, active, suspended, blocked).
//! - `Permission`: the capability tags granted to the account.
//!
//! `Role` is a label computed from permissions. It is never read back as a
//! third source of truth for access checks.

pub mod phone;
pub mod record;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use record::{InvalidProfile, ProfileRecord};

// =============================================================================
// ACCOUNT STATUS
// =============================================================================

/// Account lifecycle status stored on the profile record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Active,
    Suspended,
    Blocked,
}

impl AccountStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Active, Self::Suspended, Self::Blocked];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Blocked => "blocked",
        }
    }

    /// Suspended and blocked accounts are valid but deliberately locked.
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Suspended | Self::Blocked)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = InvalidProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidProfile::UnknownStatus(s.to_owned()))
    }
}

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Capability tag granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageSystem,
    ManageAgents,
    ManageClients,
    ManageContracts,
    ViewContracts,
}

impl Permission {
    pub const ALL: [Self; 5] = [
        Self::ManageSystem,
        Self::ManageAgents,
        Self::ManageClients,
        Self::ManageContracts,
        Self::ViewContracts,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageSystem => "manage_system",
            Self::ManageAgents => "manage_agents",
            Self::ManageClients => "manage_clients",
            Self::ManageContracts => "manage_contracts",
            Self::ViewContracts => "view_contracts",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = InvalidProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|perm| perm.as_str() == s)
            .ok_or_else(|| InvalidProfile::UnknownPermission(s.to_owned()))
    }
}

// =============================================================================
// ROLE (DERIVED LABEL)
// =============================================================================

/// Convenience label shown in the UI and stored alongside the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Agent,
    User,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Agent, Self::User];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::User => "user",
        }
    }

    /// Derive the label from a permission set.
    #[must_use]
    pub fn from_permissions(permissions: &BTreeSet<Permission>) -> Self {
        if permissions.contains(&Permission::ManageSystem) {
            Self::Admin
        } else if permissions.contains(&Permission::ManageClients) || permissions.contains(&Permission::ManageContracts)
        {
            Self::Agent
        } else {
            Self::User
        }
    }

    /// Permissions granted by default to a legacy role label.
    #[must_use]
    pub fn default_permissions(self) -> BTreeSet<Permission> {
        let perms: &[Permission] = match self {
            Self::Admin => &[
                Permission::ManageSystem,
                Permission::ManageAgents,
                Permission::ManageClients,
                Permission::ManageContracts,
            ],
            Self::Agent => &[Permission::ManageClients, Permission::ManageContracts],
            Self::User => &[Permission::ViewContracts],
        };
        perms.iter().copied().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| InvalidProfile::UnknownRole(s.to_owned()))
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Validated projection of the authenticated user's profile.
///
/// Only produced by [`ProfileRecord::validate`]; anything that fails
/// validation never becomes an `Identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub status: AccountStatus,
    pub permissions: BTreeSet<Permission>,
    pub avatar_url: Option<String>,
    pub agency_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_permissions(&self.permissions)
    }

    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    #[must_use]
    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.permissions.contains(p))
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    /// Up to two uppercase initials for avatar placeholders.
    #[must_use]
    pub fn initials(&self) -> String {
        [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|part| part.trim().chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// `"first last"`, trimmed so a missing half leaves no stray space.
#[must_use]
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_owned()
}
