//! In-memory platform used by unit tests across the crate.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, broadcast};
use uuid::Uuid;

use super::{
    AUTH_EVENT_CAPACITY, AuthEvent, BlobStore, Credential, IdentityProvider, PlatformError, ProfileStore,
    SignUpRequest,
};
use crate::identity::{AccountStatus, Identity, Permission, ProfileRecord, Role};

pub struct FakePlatform {
    accounts: Mutex<HashMap<String, (Uuid, String)>>,
    credential: Mutex<Option<Credential>>,
    profiles: Mutex<HashMap<Uuid, ProfileRecord>>,
    blobs: Mutex<HashMap<String, (String, usize)>>,
    events: broadcast::Sender<AuthEvent>,
    credential_gate: Mutex<Option<Arc<Notify>>>,
    pub credential_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub fail_sign_out: AtomicBool,
    pub fail_credential: AtomicBool,
    pub fail_upload: AtomicBool,
}

impl Default for FakePlatform {
    fn default() -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            accounts: Mutex::new(HashMap::new()),
            credential: Mutex::new(None),
            profiles: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            events,
            credential_gate: Mutex::new(None),
            credential_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            fail_sign_out: AtomicBool::new(false),
            fail_credential: AtomicBool::new(false),
            fail_upload: AtomicBool::new(false),
        }
    }
}

impl FakePlatform {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an auth account plus profile row. Returns the account id.
    pub fn seed_account(&self, email: &str, password: &str, status: AccountStatus, perms: &[Permission]) -> Uuid {
        let id = Uuid::new_v4();
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_owned(), (id, password.to_owned()));
        let mut record = profile_record(id, status, perms);
        record.email = Some(email.to_owned());
        self.profiles.lock().unwrap().insert(id, record);
        id
    }

    /// Put a credential in place without emitting an event.
    pub fn sign_in_silently(&self, user_id: Uuid) {
        *self.credential.lock().unwrap() = Some(credential_for(user_id));
    }

    pub fn put_profile(&self, id: Uuid, record: ProfileRecord) {
        self.profiles.lock().unwrap().insert(id, record);
    }

    pub fn remove_profile(&self, id: Uuid) {
        self.profiles.lock().unwrap().remove(&id);
    }

    #[must_use]
    pub fn profile(&self, id: Uuid) -> Option<ProfileRecord> {
        self.profiles.lock().unwrap().get(&id).cloned()
    }

    #[must_use]
    pub fn blob(&self, path: &str) -> Option<(String, usize)> {
        self.blobs.lock().unwrap().get(path).cloned()
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential.lock().unwrap().is_some()
    }

    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Block `current_credential` until the returned gate is notified.
    #[must_use]
    pub fn hold_credential_lookups(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.credential_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn release_credential_lookups(&self) {
        if let Some(gate) = self.credential_gate.lock().unwrap().take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    #[must_use]
    pub fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakePlatform {
    async fn current_credential(&self) -> Result<Option<Credential>, PlatformError> {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
        // Snapshot first so a held lookup returns what was true when it started.
        let snapshot = self.credential.lock().unwrap().clone();
        let gate = self.credential_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_credential.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("connection reset".into()));
        }
        Ok(snapshot)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credential, PlatformError> {
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((id, stored)) if stored == password => {
                let credential = credential_for(id);
                *self.credential.lock().unwrap() = Some(credential.clone());
                self.emit(AuthEvent::SignedIn { user_id: id });
                Ok(credential)
            }
            _ => Err(PlatformError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Uuid, PlatformError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&request.email) {
            return Err(PlatformError::Conflict("User already registered".into()));
        }
        let id = Uuid::new_v4();
        accounts.insert(request.email.clone(), (id, request.password.clone()));
        Ok(id)
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(PlatformError::Response { status: 503, message: "unavailable".into() });
        }
        *self.credential.lock().unwrap() = None;
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Credential, PlatformError> {
        let credential = self
            .credential
            .lock()
            .unwrap()
            .clone()
            .ok_or(PlatformError::NotSignedIn)?;
        self.emit(AuthEvent::TokenRefreshed { user_id: credential.user_id });
        Ok(credential)
    }

    async fn verify_access_token(&self, token: &str) -> Result<Uuid, PlatformError> {
        token
            .strip_prefix("token-")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(PlatformError::InvalidCredentials)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait::async_trait]
impl ProfileStore for FakePlatform {
    async fn fetch_profile(&self, id: Uuid) -> Result<Option<ProfileRecord>, PlatformError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().unwrap().get(&id).cloned())
    }

    async fn insert_profile(&self, record: &ProfileRecord) -> Result<(), PlatformError> {
        let id = record
            .id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| PlatformError::Response { status: 400, message: "missing id".into() })?;
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&id) {
            return Err(PlatformError::Conflict("duplicate key value".into()));
        }
        profiles.insert(id, record.clone());
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfileRecord) -> Result<(), PlatformError> {
        let mut profiles = self.profiles.lock().unwrap();
        let Some(row) = profiles.get_mut(&id) else {
            return Err(PlatformError::Response { status: 404, message: "no such profile".into() });
        };
        merge_patch(row, patch);
        Ok(())
    }

    async fn count_profiles(&self) -> Result<u64, PlatformError> {
        Ok(self.profiles.lock().unwrap().len() as u64)
    }
}

#[async_trait::async_trait]
impl BlobStore for FakePlatform {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), PlatformError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(PlatformError::Response { status: 500, message: "storage down".into() });
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(path.to_owned(), (content_type.to_owned(), bytes.len()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/avatars/{path}")
    }
}

fn merge_patch(row: &mut ProfileRecord, patch: &ProfileRecord) {
    macro_rules! take {
        ($($field:ident),*) => {
            $(if patch.$field.is_some() { row.$field = patch.$field.clone(); })*
        };
    }
    take!(
        email, first_name, last_name, display_name, phone, status, role, permissions, avatar_url, agency_id,
        updated_at
    );
}

#[must_use]
pub fn credential_for(user_id: Uuid) -> Credential {
    Credential {
        user_id,
        email: None,
        access_token: format!("token-{user_id}"),
        refresh_token: Some("refresh".into()),
        expires_in: Some(3600),
    }
}

#[must_use]
pub fn profile_record(id: Uuid, status: AccountStatus, perms: &[Permission]) -> ProfileRecord {
    let set: BTreeSet<Permission> = perms.iter().copied().collect();
    ProfileRecord {
        id: Some(id.to_string()),
        email: Some(format!("{id}@g3a.ci")),
        first_name: Some("Awa".into()),
        last_name: Some("Kone".into()),
        display_name: Some("Awa Kone".into()),
        phone: Some("+2250758337279".into()),
        status: Some(status.as_str().into()),
        role: Some(Role::from_permissions(&set).as_str().into()),
        permissions: Some(set.iter().map(|p| p.as_str().to_owned()).collect()),
        ..ProfileRecord::default()
    }
}

#[must_use]
pub fn identity(status: AccountStatus, perms: &[Permission]) -> Identity {
    profile_record(Uuid::new_v4(), status, perms)
        .validate()
        .unwrap()
}
