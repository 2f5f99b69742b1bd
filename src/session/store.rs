//! The session store and its platform event listener.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::{LoadingState, Session};
use crate::busy::BusyFlag;
use crate::identity::{Identity, InvalidProfile};
use crate::platform::{AuthEvent, IdentityProvider, PlatformError, ProfileStore};

const FETCH_INTERRUPTED: &str = "session fetch interrupted";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store already started")]
    AlreadyStarted,
    #[error("email and password are required")]
    MissingCredentials,
    #[error("no profile found for the signed-in account")]
    ProfileMissing,
    #[error("invalid user profile: {0}")]
    InvalidProfile(#[from] InvalidProfile),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

// =============================================================================
// INNER STATE
// =============================================================================

#[derive(Debug, Default)]
struct Control {
    /// Latest request token handed out.
    generation: u64,
    /// Token of the fetch currently awaiting the platform, if any.
    in_flight: Option<u64>,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    state: watch::Sender<Session>,
    control: Mutex<Control>,
    listener: Mutex<Option<JoinHandle<()>>>,
    submitting: BusyFlag,
}

impl Inner {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_token(control: &mut Control) -> u64 {
        control.generation += 1;
        control.generation
    }

    /// Start a fetch unless a current one is already in flight.
    fn try_begin_fetch(&self) -> Option<u64> {
        let mut control = self.control();
        if control.in_flight.is_some_and(|t| t == control.generation) {
            return None;
        }
        Some(self.begin_fetch_locked(&mut control))
    }

    /// Start a fetch that supersedes anything in flight.
    fn begin_forced_fetch(&self) -> u64 {
        let mut control = self.control();
        self.begin_fetch_locked(&mut control)
    }

    fn begin_fetch_locked(&self, control: &mut Control) -> u64 {
        let token = Self::next_token(control);
        control.in_flight = Some(token);
        self.state.send_modify(|s| {
            s.loading = LoadingState::Loading;
            s.last_error = None;
            s.epoch = token;
        });
        token
    }

    /// Publish a settled state if `token` is still current.
    fn settle(&self, token: u64, identity: Option<Identity>, last_error: Option<String>) -> bool {
        let mut control = self.control();
        if control.in_flight == Some(token) {
            control.in_flight = None;
        }
        if control.generation != token {
            debug!(token, current = control.generation, "discarding superseded session completion");
            return false;
        }
        self.state
            .send_replace(Session::settled(identity, last_error, token));
        true
    }

    /// Drop the identity immediately, superseding any in-flight work.
    fn clear(&self) -> u64 {
        let mut control = self.control();
        let token = Self::next_token(&mut control);
        control.in_flight = None;
        self.state.send_replace(Session::settled(None, None, token));
        token
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = listener.take() {
            handle.abort();
        }
    }
}

/// Settles the session when dropped unless completed explicitly, so a future
/// cancelled mid-await can never leave the store in `Loading`.
struct SettleGuard<'a> {
    inner: &'a Inner,
    token: u64,
    fallback_error: Option<&'static str>,
    armed: bool,
}

impl<'a> SettleGuard<'a> {
    fn new(inner: &'a Inner, token: u64, fallback_error: Option<&'static str>) -> Self {
        Self { inner, token, fallback_error, armed: true }
    }

    fn complete(mut self, identity: Option<Identity>, last_error: Option<String>) -> bool {
        self.armed = false;
        self.inner.settle(self.token, identity, last_error)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(token = self.token, "session operation dropped before completion");
            self.inner
                .settle(self.token, None, self.fallback_error.map(str::to_owned));
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Process-wide authority on who is signed in.
///
/// Constructed explicitly and shared by cloning the handle. Call
/// [`SessionStore::start`] to perform the initial fetch and begin following
/// platform auth events, and [`SessionStore::dispose`] to stop.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                profiles,
                state,
                control: Mutex::new(Control::default()),
                listener: Mutex::new(None),
                submitting: BusyFlag::new(),
            }),
        }
    }

    /// Spawn the auth event listener, which first runs the initial fetch.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` if a listener is already running.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(SessionError::AlreadyStarted);
        }
        let events = self.inner.provider.subscribe();
        *listener = Some(tokio::spawn(listen(Arc::downgrade(&self.inner), events)));
        info!("session store started");
        Ok(())
    }

    /// Stop following platform events and discard in-flight completions.
    pub fn dispose(&self) {
        let handle = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        let mut control = self.inner.control();
        let token = Inner::next_token(&mut control);
        control.in_flight = None;
        self.inner.state.send_modify(|s| {
            if !s.is_settled() {
                *s = Session::settled(None, None, token);
            }
        });
        info!("session store disposed");
    }

    /// Current snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver for observers; dropping it unsubscribes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Wait until the session is settled and return that snapshot.
    pub async fn settled(&self) -> Session {
        let mut rx = self.inner.state.subscribe();
        let settled = rx
            .wait_for(Session::is_settled)
            .await
            .map(|session| (*session).clone());
        settled.unwrap_or_else(|_| self.session())
    }

    /// Pending flag for login submissions.
    #[must_use]
    pub fn submitting(&self) -> &BusyFlag {
        &self.inner.submitting
    }

    /// Load the identity for the ambient platform session.
    ///
    /// Coalesces into a no-op while a current fetch is already in flight.
    pub async fn fetch_user(&self) {
        let Some(token) = self.inner.try_begin_fetch() else {
            debug!("fetch_user coalesced into in-flight fetch");
            return;
        };
        self.run_fetch(token).await;
    }

    /// Forced re-fetch; any in-flight fetch is superseded and its result
    /// discarded.
    pub async fn refresh(&self) {
        let token = self.inner.begin_forced_fetch();
        self.run_fetch(token).await;
    }

    /// Terminate the platform session. The local session ends up signed out
    /// whether or not the platform call succeeds.
    pub async fn logout(&self) {
        let token = {
            let mut control = self.inner.control();
            let token = Inner::next_token(&mut control);
            control.in_flight = None;
            self.inner.state.send_replace(Session {
                identity: None,
                loading: LoadingState::Loading,
                last_error: None,
                epoch: token,
            });
            token
        };
        let guard = SettleGuard::new(&self.inner, token, None);

        if let Err(e) = self.inner.provider.sign_out().await {
            warn!(error = %e, "platform sign-out failed; clearing local session anyway");
        }
        guard.complete(None, None);
        info!("logged out");
    }

    /// Sign in with email and password, then load the profile.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` for blank input, or the platform error
    /// when the credentials are rejected. Profile problems after a
    /// successful sign-in are reported through the returned session's
    /// `last_error` instead.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }

        let _busy = self.inner.submitting.begin();
        self.inner
            .provider
            .sign_in_with_password(email, password)
            .await?;
        self.refresh().await;
        Ok(self.settled().await)
    }

    async fn run_fetch(&self, token: u64) {
        debug!(token, "fetching user");
        let guard = SettleGuard::new(&self.inner, token, Some(FETCH_INTERRUPTED));

        match self.resolve_identity().await {
            Ok(Some(identity)) => {
                let (user_id, status, role) = (identity.id, identity.status, identity.role());
                if guard.complete(Some(identity), None) {
                    info!(%user_id, %status, %role, "session settled with identity");
                }
            }
            Ok(None) => {
                if guard.complete(None, None) {
                    debug!("session settled without platform credential");
                }
            }
            Err(e) => {
                warn!(error = %e, "user fetch failed; settling signed out");
                guard.complete(None, Some(e.to_string()));
            }
        }
    }

    async fn resolve_identity(&self) -> Result<Option<Identity>, SessionError> {
        let Some(credential) = self.inner.provider.current_credential().await? else {
            return Ok(None);
        };
        let record = self
            .inner
            .profiles
            .fetch_profile(credential.user_id)
            .await?
            .ok_or(SessionError::ProfileMissing)?;
        Ok(Some(record.validate_for(credential.user_id)?))
    }

    async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn { user_id } => {
                // An in-flight fetch read the credential before this sign-in.
                debug!(%user_id, "platform sign-in; superseding any in-flight fetch");
                self.refresh().await;
            }
            AuthEvent::TokenRefreshed { user_id } => {
                let same_user = self
                    .inner
                    .state
                    .borrow()
                    .identity
                    .as_ref()
                    .is_some_and(|identity| identity.id == user_id);
                debug!(%user_id, same_user, "platform token refreshed");
                if same_user {
                    self.fetch_user().await;
                } else {
                    self.refresh().await;
                }
            }
            AuthEvent::UserUpdated { user_id } => {
                debug!(%user_id, "platform user updated");
                self.refresh().await;
            }
            AuthEvent::SignedOut => {
                let token = self.inner.clear();
                info!(token, "signed out by platform");
            }
        }
    }
}

async fn listen(store: Weak<Inner>, mut events: broadcast::Receiver<AuthEvent>) {
    match store.upgrade() {
        Some(inner) => SessionStore { inner }.fetch_user().await,
        None => return,
    }

    loop {
        let event = match events.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "auth events lagged; resynchronising");
                None
            }
            Err(RecvError::Closed) => break,
        };
        let Some(inner) = store.upgrade() else {
            break;
        };
        let handle = SessionStore { inner };
        match event {
            Some(event) => handle.handle_event(event).await,
            None => handle.refresh().await,
        }
    }
    debug!("auth event listener stopped");
}
