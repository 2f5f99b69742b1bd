//! Reset-db route: bearer extraction and the JSON response envelope.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::maintenance::{self, ResetError, ResetReport};
use crate::state::AppState;

const RESET_MESSAGE: &str = "database reset complete; protected rows kept";

/// Body of every reset-db response.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ResetReport>,
}

/// Token from an `Authorization: Bearer <token>` header. A bare token
/// without the scheme is accepted as well.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        // A lone scheme name carries no token.
        (Some(token), None, None) if !token.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

pub(crate) fn reset_error_to_status(err: &ResetError) -> StatusCode {
    match err {
        ResetError::MissingToken | ResetError::InvalidToken => StatusCode::UNAUTHORIZED,
        ResetError::NotAdmin => StatusCode::FORBIDDEN,
        ResetError::Platform(_) => StatusCode::BAD_GATEWAY,
        ResetError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `POST /functions/v1/reset-db`: clear business tables (admin only).
pub async fn reset_db(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let result = maintenance::authorize_and_reset(
        state.identity.as_ref(),
        state.reset.as_ref(),
        bearer_token(&headers),
    )
    .await;

    match result {
        Ok(report) => Json(Envelope {
            success: true,
            message: Some(RESET_MESSAGE.to_owned()),
            error: None,
            report: Some(report),
        })
        .into_response(),
        Err(e) => {
            let status = reset_error_to_status(&e);
            if status.is_server_error() {
                error!(error = %e, "reset-db failed");
            } else {
                warn!(error = %e, %status, "reset-db rejected");
            }
            let body = Envelope { success: false, message: None, error: Some(e.to_string()), report: None };
            (status, Json(body)).into_response()
        }
    }
}
