//! Account operations: registration, self-service edits, admin edits and
//! avatar upload.
//!
//! DESIGN
//! ======
//! Every operation validates its input completely before the first platform
//! call, so a rejected form never leaves a partial write behind. Operations
//! that change the signed-in user's own profile return the updated
//! [`Identity`]; callers then `refresh()` the session store so guards see
//! the change.
//!
//! Admin edits are authorized here as well as by row-level security on the
//! platform: the actor must be active and hold `manage_agents` or
//! `manage_system`.

pub mod avatar;
pub mod error;
pub mod registration;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::busy::BusyFlag;
use crate::identity::phone::PhoneNumber;
use crate::identity::{AccountStatus, Identity, Permission, ProfileRecord, Role, full_name};
use crate::platform::{BlobStore, IdentityProvider, ProfileStore, SignUpRequest};
pub use avatar::{AvatarUpload, MAX_AVATAR_BYTES, avatar_object_path};
pub use error::{ProfileError, UploadError, ValidationError};
pub use registration::{NewAccount, Registration, RegistrationForm, initial_grant};

/// Permissions that allow editing other accounts.
const ACCOUNT_ADMIN_PERMISSIONS: [Permission; 2] = [Permission::ManageAgents, Permission::ManageSystem];

/// Owner-editable fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    blobs: Arc<dyn BlobStore>,
    busy: BusyFlag,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self { provider, profiles, blobs, busy: BusyFlag::new() }
    }

    /// Pending flag shared by every operation of this service.
    #[must_use]
    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Create the auth account and its profile record.
    ///
    /// The first account ever registered becomes an active administrator;
    /// every later one starts pending with client management only.
    ///
    /// # Errors
    ///
    /// `Invalid` for rejected input, `EmailTaken` when the address is
    /// already registered, `Platform` for other backend failures.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Registration, ProfileError> {
        let account = form.validate()?;
        let _busy = self.busy.begin();

        let first_account = self.profiles.count_profiles().await? == 0;
        let (status, permissions) = initial_grant(first_account);
        let role = Role::from_permissions(&permissions);
        let tags: Vec<String> = permissions.iter().map(|p| p.as_str().to_owned()).collect();

        let request = SignUpRequest {
            email: account.email.clone(),
            password: account.password.clone(),
            metadata: json!({
                "first_name": account.first_name,
                "last_name": account.last_name,
                "phone": account.phone.as_str(),
                "role": role.as_str(),
                "status": status.as_str(),
                "permissions": tags,
            }),
        };
        let user_id = self.provider.sign_up(&request).await?;

        let record = ProfileRecord {
            id: Some(user_id.to_string()),
            email: Some(account.email.clone()),
            first_name: Some(account.first_name.clone()),
            last_name: Some(account.last_name.clone()),
            display_name: Some(full_name(&account.first_name, &account.last_name)),
            phone: Some(account.phone.into_string()),
            status: Some(status.as_str().to_owned()),
            role: Some(role.as_str().to_owned()),
            permissions: Some(tags),
            ..ProfileRecord::default()
        };
        if let Err(e) = self.profiles.insert_profile(&record).await {
            warn!(%user_id, error = %e, "auth account created but profile insert failed");
            return Err(e.into());
        }

        info!(%user_id, %status, %role, first_account, "account registered");
        Ok(Registration { user_id, status, permissions, first_account })
    }

    // =========================================================================
    // SELF-SERVICE
    // =========================================================================

    /// Apply the owner's own name/phone edits and recompute the display name.
    ///
    /// # Errors
    ///
    /// `Invalid` for blank names or a bad phone number; `Platform` when the
    /// write fails.
    pub async fn update_own_profile(&self, owner: &Identity, changes: &ProfileChanges) -> Result<Identity, ProfileError> {
        let first_name = changes
            .first_name
            .as_deref()
            .map(|v| registration::required(v, "first name"))
            .transpose()?;
        let last_name = changes
            .last_name
            .as_deref()
            .map(|v| registration::required(v, "last name"))
            .transpose()?;
        let phone = changes
            .phone
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(ValidationError::from)?;

        let mut updated = owner.clone();
        if let Some(first_name) = first_name {
            first_name.clone_into(&mut updated.first_name);
        }
        if let Some(last_name) = last_name {
            last_name.clone_into(&mut updated.last_name);
        }
        if let Some(phone) = phone {
            updated.phone = phone.into_string();
        }
        updated.display_name = updated.full_name();

        let patch = ProfileRecord {
            first_name: Some(updated.first_name.clone()),
            last_name: Some(updated.last_name.clone()),
            display_name: Some(updated.display_name.clone()),
            phone: Some(updated.phone.clone()),
            ..ProfileRecord::default()
        };

        let _busy = self.busy.begin();
        self.profiles.update_profile(owner.id, &patch).await?;
        info!(user_id = %owner.id, "profile updated");
        Ok(updated)
    }

    /// Upload a new avatar image and point the owner's profile at it.
    /// Returns the public URL.
    ///
    /// # Errors
    ///
    /// `Upload` for rejected files; `Platform` when storage or the profile
    /// write fails.
    pub async fn upload_avatar(&self, owner: &Identity, upload: AvatarUpload) -> Result<String, ProfileError> {
        upload.validate()?;
        let path = avatar_object_path(owner.id, &upload.extension());
        let _busy = self.busy.begin();

        let size = upload.bytes.len();
        self.blobs
            .upload(&path, upload.bytes, &upload.content_type)
            .await?;
        let url = self.blobs.public_url(&path);

        let patch = ProfileRecord { avatar_url: Some(url.clone()), ..ProfileRecord::default() };
        self.profiles.update_profile(owner.id, &patch).await?;
        info!(user_id = %owner.id, %path, size, "avatar uploaded");
        Ok(url)
    }

    // =========================================================================
    // ADMIN EDITS
    // =========================================================================

    /// Approve, suspend, block or reinstate another account.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the actor may not manage accounts, targets
    /// themselves, or targets a system manager without being one;
    /// `UnknownAccount` when the target has no profile; `Platform` when the
    /// write fails.
    pub async fn set_status(&self, actor: &Identity, target: Uuid, status: AccountStatus) -> Result<(), ProfileError> {
        authorize_account_admin(actor)?;
        if target == actor.id {
            return Err(ProfileError::Forbidden("an account cannot change its own status"));
        }
        if !actor.has_permission(Permission::ManageSystem) {
            let record = self
                .profiles
                .fetch_profile(target)
                .await?
                .ok_or(ProfileError::UnknownAccount(target))?;
            if record.validate()?.has_permission(Permission::ManageSystem) {
                return Err(ProfileError::Forbidden("only system managers can change a system manager's status"));
            }
        }

        let patch = ProfileRecord { status: Some(status.as_str().to_owned()), ..ProfileRecord::default() };
        let _busy = self.busy.begin();
        self.profiles.update_profile(target, &patch).await?;
        info!(actor = %actor.id, %target, %status, "account status changed");
        Ok(())
    }

    /// Replace another account's permission set. The stored role label is
    /// rewritten to match.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the actor may not manage accounts, or tries to grant
    /// `manage_system` without holding it; `Platform` when the write fails.
    pub async fn set_permissions(
        &self,
        actor: &Identity,
        target: Uuid,
        permissions: &BTreeSet<Permission>,
    ) -> Result<(), ProfileError> {
        authorize_account_admin(actor)?;
        if permissions.contains(&Permission::ManageSystem) && !actor.has_permission(Permission::ManageSystem) {
            return Err(ProfileError::Forbidden("only system managers can grant manage_system"));
        }

        let role = Role::from_permissions(permissions);
        let patch = ProfileRecord {
            role: Some(role.as_str().to_owned()),
            permissions: Some(permissions.iter().map(|p| p.as_str().to_owned()).collect()),
            ..ProfileRecord::default()
        };
        let _busy = self.busy.begin();
        self.profiles.update_profile(target, &patch).await?;
        info!(actor = %actor.id, %target, %role, count = permissions.len(), "permissions changed");
        Ok(())
    }
}

fn authorize_account_admin(actor: &Identity) -> Result<(), ProfileError> {
    if actor.status != AccountStatus::Active {
        return Err(ProfileError::Forbidden("account administration requires an active account"));
    }
    if !actor.has_any_permission(&ACCOUNT_ADMIN_PERMISSIONS) {
        return Err(ProfileError::Forbidden("account administration requires manage_agents or manage_system"));
    }
    Ok(())
}
