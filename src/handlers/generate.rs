use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Advisory length hint; already baked into the prompt by the client,
    /// accepted here so older clients don't get rejected.
    #[serde(default, rename = "wordCount")]
    pub word_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub html: String,
}

/// POST /generate — proxy a generation request so the provider API key
/// never reaches the client.
pub async fn generate_page(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("Missing prompt in request body.".into()));
    }

    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| AppError::Internal(msg::GENERATOR_NOT_CONFIGURED.into()))?;

    let html = generator.generate(&request.prompt).await?;
    Ok(Json(GenerateResponse { html }))
}
