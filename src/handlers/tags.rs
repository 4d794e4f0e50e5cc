//! Tag endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::error::ApiError;
use crate::models::{Tag, TagColorUpdate, TagCreate};
use crate::state::SharedState;
use crate::storage::TagRepo;

/// GET /api/tags
pub async fn list_tags(State(state): State<SharedState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let db = state.db()?;
    let repo = TagRepo::new(&db.conn);
    Ok(Json(repo.list()?))
}

/// POST /api/tags - Create a tag; idempotent on name
pub async fn create_tag(
    State(state): State<SharedState>,
    Json(data): Json<TagCreate>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    if data.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Tag name cannot be empty".to_string()));
    }

    let db = state.db()?;
    let repo = TagRepo::new(&db.conn);

    let tag = repo
        .create(&data.name, data.color.as_deref())?
        .ok_or_else(|| ApiError::Internal("tag vanished after create".to_string()))?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// GET /api/tags/{name}
pub async fn get_tag(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    let db = state.db()?;
    let repo = TagRepo::new(&db.conn);

    let tag = repo
        .get(&name)?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
    Ok(Json(tag))
}

/// PATCH /api/tags/{name} - Update a tag's color
pub async fn update_tag_color(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(data): Json<TagColorUpdate>,
) -> Result<Json<Tag>, ApiError> {
    let db = state.db()?;
    let repo = TagRepo::new(&db.conn);

    let tag = repo
        .update_color(&name, &data.color)?
        .ok_or_else(|| ApiError::NotFound("Tag not found".to_string()))?;
    Ok(Json(tag))
}

/// DELETE /api/tags/{name}
pub async fn delete_tag(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db()?;
    let repo = TagRepo::new(&db.conn);

    if !repo.delete(&name)? {
        return Err(ApiError::NotFound("Tag not found".to_string()));
    }

    info!("Deleted tag {}", name);
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
