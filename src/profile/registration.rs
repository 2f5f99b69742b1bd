//! Sign-up form validation and the starting authorization of new accounts.

#[cfg(test)]
#[path = "registration_test.rs"]
mod tests;

use std::collections::BTreeSet;
use std::fmt;

use uuid::Uuid;

use super::error::ValidationError;
use crate::identity::phone::PhoneNumber;
use crate::identity::{AccountStatus, Permission};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Permissions of the very first account, which administers the agency.
pub const FIRST_ACCOUNT_PERMISSIONS: [Permission; 4] = [
    Permission::ManageSystem,
    Permission::ManageAgents,
    Permission::ManageClients,
    Permission::ManageContracts,
];

/// Permissions of every later account, pending review.
pub const DEFAULT_PERMISSIONS: [Permission; 1] = [Permission::ManageClients];

/// Raw sign-up input as typed by the visitor.
#[derive(Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

/// Sign-up data that passed validation.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: PhoneNumber,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    /// # Errors
    ///
    /// Returns the first problem found, checking required fields first.
    pub fn validate(&self) -> Result<NewAccount, ValidationError> {
        let email = required(&self.email, "email")?;
        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        let first_name = required(&self.first_name, "first name")?;
        let last_name = required(&self.last_name, "last name")?;
        let phone = required(&self.phone, "phone")?;

        if !looks_like_email(email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if self.password != self.password_confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        let phone = PhoneNumber::parse(phone)?;

        Ok(NewAccount {
            email: email.to_owned(),
            password: self.password.clone(),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            phone,
        })
    }
}

/// Trimmed value, or `Required` when blank.
pub(crate) fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value)
}

/// Structural check only; the platform confirms the address by email.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: Uuid,
    pub status: AccountStatus,
    pub permissions: BTreeSet<Permission>,
    /// The account was the first ever and administers the agency.
    pub first_account: bool,
}

/// Status and permissions a new account starts with.
#[must_use]
pub fn initial_grant(first_account: bool) -> (AccountStatus, BTreeSet<Permission>) {
    if first_account {
        (AccountStatus::Active, FIRST_ACCOUNT_PERMISSIONS.into_iter().collect())
    } else {
        (AccountStatus::Pending, DEFAULT_PERMISSIONS.into_iter().collect())
    }
}
