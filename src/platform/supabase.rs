//! Supabase adapter: GoTrue auth, PostgREST `profiles`, Storage objects.
//!
//! Thin HTTP wrapper over the hosted REST endpoints. Response parsing lives in
//! free functions so it can be tested without a network.
//!
//! The adapter keeps the signed-in credential in memory only; nothing is
//! persisted locally.

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    AUTH_EVENT_CAPACITY, AuthEvent, BlobStore, Credential, IdentityProvider, PlatformError, ProfileStore,
    SignUpRequest,
};
use crate::config::PlatformConfig;
use crate::identity::ProfileRecord;

const PROFILES_TABLE: &str = "profiles";

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    bucket: String,
    session: RwLock<Option<Credential>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    /// Build a client for the project described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| PlatformError::HttpClientBuild(e.to_string()))?;
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
            bucket: config.avatar_bucket.clone(),
            session: RwLock::new(None),
            events,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, query: &str) -> String {
        format!("{}/rest/v1/{query}", self.base_url)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{path}", self.base_url, self.bucket)
    }

    /// Attach the project key and a bearer: the user's token when signed in
    /// (so row-level security applies to them), otherwise the anon key.
    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map_or_else(|| self.anon_key.clone(), |c| c.access_token.clone());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine; the event is simply dropped.
        let _ = self.events.send(event);
    }

    async fn store_session(&self, credential: Credential) {
        *self.session.write().await = Some(credential);
    }

    async fn clear_session(&self) -> Option<Credential> {
        self.session.write().await.take()
    }

    async fn fetch_user_id(&self, access_token: &str) -> Result<Uuid, PlatformError> {
        let resp = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let body = read_body(resp).await?;
        parse_user_id(&body)
    }
}

async fn read_body(resp: Response) -> Result<String, PlatformError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(classify_error(status, &body))
    }
}

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

#[async_trait::async_trait]
impl IdentityProvider for SupabaseClient {
    async fn current_credential(&self) -> Result<Option<Credential>, PlatformError> {
        let Some(credential) = self.session.read().await.clone() else {
            return Ok(None);
        };
        match self.fetch_user_id(&credential.access_token).await {
            Ok(_) => Ok(Some(credential)),
            Err(PlatformError::InvalidCredentials) => {
                info!(user_id = %credential.user_id, "stored session rejected by platform; clearing");
                self.clear_session().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credential, PlatformError> {
        let resp = self
            .http
            .post(self.auth_url("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(PlatformError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let credential = parse_session(&body)?;
        let user_id = credential.user_id;
        self.store_session(credential.clone()).await;
        info!(%user_id, "signed in");
        self.emit(AuthEvent::SignedIn { user_id });
        Ok(credential)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Uuid, PlatformError> {
        let resp = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }))
            .send()
            .await?;
        let body = read_body(resp).await?;
        parse_signup_user_id(&body)
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        let Some(credential) = self.clear_session().await else {
            return Ok(());
        };
        let result = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(PlatformError::from);
        // The local credential is gone either way; tell subscribers.
        self.emit(AuthEvent::SignedOut);
        read_body(result?).await.map(|_| ())
    }

    async fn refresh_session(&self) -> Result<Credential, PlatformError> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .ok_or(PlatformError::NotSignedIn)?;

        let resp = self
            .http
            .post(self.auth_url("token?grant_type=refresh_token"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            warn!("refresh token rejected; signing out locally");
            self.clear_session().await;
            self.emit(AuthEvent::SignedOut);
            return Err(PlatformError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let credential = parse_session(&body)?;
        let user_id = credential.user_id;
        self.store_session(credential.clone()).await;
        debug!(%user_id, "session token refreshed");
        self.emit(AuthEvent::TokenRefreshed { user_id });
        Ok(credential)
    }

    async fn verify_access_token(&self, token: &str) -> Result<Uuid, PlatformError> {
        self.fetch_user_id(token).await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// PROFILE STORE
// =============================================================================

#[async_trait::async_trait]
impl ProfileStore for SupabaseClient {
    async fn fetch_profile(&self, id: Uuid) -> Result<Option<ProfileRecord>, PlatformError> {
        let url = self.rest_url(&format!("{PROFILES_TABLE}?id=eq.{id}&select=*"));
        let resp = self.authorized(self.http.get(url)).await.send().await?;
        let body = read_body(resp).await?;
        parse_profile_rows(&body)
    }

    async fn insert_profile(&self, record: &ProfileRecord) -> Result<(), PlatformError> {
        let url = self.rest_url(PROFILES_TABLE);
        let resp = self
            .authorized(self.http.post(url))
            .await
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        read_body(resp).await.map(|_| ())
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfileRecord) -> Result<(), PlatformError> {
        let url = self.rest_url(&format!("{PROFILES_TABLE}?id=eq.{id}"));
        let resp = self
            .authorized(self.http.patch(url))
            .await
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        read_body(resp).await.map(|_| ())
    }

    async fn count_profiles(&self) -> Result<u64, PlatformError> {
        let url = self.rest_url(&format!("{PROFILES_TABLE}?select=id"));
        let resp = self
            .authorized(self.http.head(url))
            .await
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(classify_error(status, ""));
        }
        resp.headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| PlatformError::Parse("missing content-range count".into()))
    }
}

// =============================================================================
// BLOB STORE
// =============================================================================

#[async_trait::async_trait]
impl BlobStore for SupabaseClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), PlatformError> {
        let resp = self
            .authorized(self.http.post(self.object_url(path)))
            .await
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        read_body(resp).await.map(|_| ())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.base_url, &self.bucket, path)
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    user: AuthUser,
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
    email: Option<String>,
}

fn parse_session(body: &str) -> Result<Credential, PlatformError> {
    let token: TokenResponse = serde_json::from_str(body).map_err(|e| PlatformError::Parse(e.to_string()))?;
    Ok(Credential {
        user_id: token.user.id,
        email: token.user.email,
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_in: token.expires_in,
    })
}

fn parse_user_id(body: &str) -> Result<Uuid, PlatformError> {
    let user: AuthUser = serde_json::from_str(body).map_err(|e| PlatformError::Parse(e.to_string()))?;
    Ok(user.id)
}

/// Sign-up answers with either a bare user or a session wrapping one,
/// depending on whether email confirmation is required.
fn parse_signup_user_id(body: &str) -> Result<Uuid, PlatformError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| PlatformError::Parse(e.to_string()))?;
    let raw = value
        .get("user")
        .and_then(|u| u.get("id"))
        .or_else(|| value.get("id"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| PlatformError::Parse("sign-up response has no user id".into()))?;
    Uuid::parse_str(raw).map_err(|e| PlatformError::Parse(e.to_string()))
}

fn parse_profile_rows(body: &str) -> Result<Option<ProfileRecord>, PlatformError> {
    let rows: Vec<ProfileRecord> = serde_json::from_str(body).map_err(|e| PlatformError::Parse(e.to_string()))?;
    Ok(rows.into_iter().next())
}

/// `Content-Range: 0-24/3573` or `*/0` → total row count.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn public_object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!("{base_url}/storage/v1/object/public/{bucket}/{path}")
}

/// Best human-readable message from a GoTrue / PostgREST / Storage error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
}

fn classify_error(status: StatusCode, body: &str) -> PlatformError {
    let message = error_message(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_owned()
        } else {
            trimmed.to_owned()
        }
    });

    let lowered = message.to_ascii_lowercase();
    if status == StatusCode::CONFLICT || lowered.contains("duplicate key") || lowered.contains("already registered") {
        return PlatformError::Conflict(message);
    }
    if status == StatusCode::UNAUTHORIZED {
        return PlatformError::InvalidCredentials;
    }
    PlatformError::Response { status: status.as_u16(), message }
}
