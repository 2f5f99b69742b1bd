//! Raw `profiles` row and its structural validation.
//!
//! The same shape is used for reads, inserts and partial updates; absent
//! fields are skipped when serialized so a record doubles as a patch body.

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountStatus, Identity, Permission, Role, full_name};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidProfile {
    #[error("profile field `{0}` is missing or empty")]
    MissingField(&'static str),
    #[error("profile id is not a valid uuid: {0}")]
    InvalidId(String),
    #[error("profile id {found} does not match session user {expected}")]
    IdMismatch { expected: Uuid, found: Uuid },
    #[error("unknown account status: {0}")]
    UnknownStatus(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
}

/// Wire shape of a row in the `profiles` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn required<'a>(value: Option<&'a String>, field: &'static str) -> Result<&'a str, InvalidProfile> {
    value
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or(InvalidProfile::MissingField(field))
}

impl ProfileRecord {
    /// Check required fields and closed enumerations, producing an `Identity`.
    ///
    /// Rows written before the permission column existed carry only a role
    /// label; those fall back to the label's default permission set.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found. Callers must treat any
    /// error as "not authenticated".
    pub fn validate(&self) -> Result<Identity, InvalidProfile> {
        let raw_id = required(self.id.as_ref(), "id")?;
        let id = Uuid::parse_str(raw_id).map_err(|_| InvalidProfile::InvalidId(raw_id.to_owned()))?;
        let email = required(self.email.as_ref(), "email")?;
        let first_name = required(self.first_name.as_ref(), "first_name")?;
        let last_name = required(self.last_name.as_ref(), "last_name")?;
        let phone = required(self.phone.as_ref(), "phone")?;
        let status: AccountStatus = required(self.status.as_ref(), "status")?.parse()?;

        let role = self
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()?;

        let permissions = match (&self.permissions, role) {
            (Some(tags), _) => tags
                .iter()
                .map(|tag| tag.parse::<Permission>())
                .collect::<Result<BTreeSet<_>, _>>()?,
            (None, Some(role)) => role.default_permissions(),
            (None, None) => BTreeSet::new(),
        };

        let display_name = self
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or_else(|| full_name(first_name, last_name), str::to_owned);

        Ok(Identity {
            id,
            email: email.to_owned(),
            display_name,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            phone: phone.to_owned(),
            status,
            permissions,
            avatar_url: self.avatar_url.clone().filter(|v| !v.is_empty()),
            agency_id: self.agency_id.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        })
    }

    /// Validate and additionally require the row to belong to `expected`.
    ///
    /// # Errors
    ///
    /// Returns `IdMismatch` when the row id differs from the session user.
    pub fn validate_for(&self, expected: Uuid) -> Result<Identity, InvalidProfile> {
        let identity = self.validate()?;
        if identity.id != expected {
            return Err(InvalidProfile::IdMismatch { expected, found: identity.id });
        }
        Ok(identity)
    }
}

impl From<&Identity> for ProfileRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            id: Some(identity.id.to_string()),
            email: Some(identity.email.clone()),
            first_name: Some(identity.first_name.clone()),
            last_name: Some(identity.last_name.clone()),
            display_name: Some(identity.display_name.clone()),
            phone: Some(identity.phone.clone()),
            status: Some(identity.status.as_str().to_owned()),
            role: Some(identity.role().as_str().to_owned()),
            permissions: Some(
                identity
                    .permissions
                    .iter()
                    .map(|p| p.as_str().to_owned())
                    .collect(),
            ),
            avatar_url: identity.avatar_url.clone(),
            agency_id: identity.agency_id.clone(),
            created_at: identity.created_at.clone(),
            updated_at: identity.updated_at.clone(),
        }
    }
}
