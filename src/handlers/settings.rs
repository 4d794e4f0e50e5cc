//! Settings endpoints for the ADS API key

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::services::settings_store::validate_ads_api_key;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AdsKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct AdsKeyStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdsKeyValidation {
    pub valid: bool,
    pub message: String,
}

/// GET /api/settings/ads-key/status
pub async fn ads_key_status(
    State(state): State<SharedState>,
) -> Result<Json<AdsKeyStatus>, ApiError> {
    Ok(Json(AdsKeyStatus {
        configured: state.settings_store().has_ads_api_key(),
        valid: None,
        message: None,
    }))
}

/// POST /api/settings/ads-key - Validate and store the key
pub async fn set_ads_key(
    State(state): State<SharedState>,
    Json(request): Json<AdsKeyRequest>,
) -> Result<Json<AdsKeyStatus>, ApiError> {
    let api_key = request.api_key.trim().to_string();
    let store = state.settings_store();

    if api_key.is_empty() {
        store.set_ads_api_key("")?;
        return Ok(Json(AdsKeyStatus {
            configured: false,
            valid: None,
            message: None,
        }));
    }

    let (valid, message) =
        validate_ads_api_key(&state.http, &state.settings.ads_api_base, &api_key).await;
    if !valid {
        return Err(ApiError::BadRequest(message));
    }

    store.set_ads_api_key(&api_key)?;
    info!("ADS API key configured");

    Ok(Json(AdsKeyStatus {
        configured: true,
        valid: Some(true),
        message: Some(message),
    }))
}

/// DELETE /api/settings/ads-key
pub async fn delete_ads_key(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.settings_store().set_ads_api_key("")?;
    info!("ADS API key removed");
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

/// POST /api/settings/ads-key/validate - Validate without saving
pub async fn validate_ads_key(
    State(state): State<SharedState>,
    Json(request): Json<AdsKeyRequest>,
) -> Result<Json<AdsKeyValidation>, ApiError> {
    let (valid, message) = validate_ads_api_key(
        &state.http,
        &state.settings.ads_api_base,
        request.api_key.trim(),
    )
    .await;
    Ok(Json(AdsKeyValidation { valid, message }))
}
