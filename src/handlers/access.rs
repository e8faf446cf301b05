use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::Plan;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckAccessRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckAccessResponse {
    pub access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CheckAccessResponse {
    fn denied() -> Self {
        Self {
            access: false,
            plan: None,
            email: None,
        }
    }
}

/// POST /check-access — resolve an email or access token to the current
/// entitlement. A missing record is a normal `{access: false}`, not an
/// error; only the absence of both inputs is a client error.
pub async fn check_access(
    State(state): State<AppState>,
    Json(request): Json<CheckAccessRequest>,
) -> Result<Json<CheckAccessResponse>> {
    let email = match request.email {
        Some(email) if !email.trim().is_empty() => Some(email.to_lowercase()),
        _ => request.access_token.as_deref().and_then(|token| {
            state
                .tokens
                .resolve(token, chrono::Utc::now().timestamp_millis())
        }),
    };

    let email =
        email.ok_or_else(|| AppError::BadRequest(msg::PROVIDE_EMAIL_OR_TOKEN.into()))?;

    let record = state.store.get(&email)?;
    let response = match record {
        Some(record) if record.active => CheckAccessResponse {
            access: true,
            plan: Some(record.plan),
            email: Some(record.email),
        },
        _ => CheckAccessResponse::denied(),
    };

    Ok(Json(response))
}
