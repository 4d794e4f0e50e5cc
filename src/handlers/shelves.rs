//! Shelf endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::error::ApiError;
use crate::models::{Paper, SearchQuery, Shelf, ShelfCreate, ShelfUpdate};
use crate::state::SharedState;
use crate::storage::{PaperRepo, ShelfRepo};

/// GET /api/shelves
pub async fn list_shelves(State(state): State<SharedState>) -> Result<Json<Vec<Shelf>>, ApiError> {
    let db = state.db()?;
    let repo = ShelfRepo::new(&db.conn);
    Ok(Json(repo.list()?))
}

/// POST /api/shelves
pub async fn create_shelf(
    State(state): State<SharedState>,
    Json(data): Json<ShelfCreate>,
) -> Result<(StatusCode, Json<Shelf>), ApiError> {
    if data.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Shelf name cannot be empty".to_string()));
    }

    let db = state.db()?;
    let repo = ShelfRepo::new(&db.conn);

    if repo.get_by_name(&data.name)?.is_some() {
        return Err(ApiError::Conflict(
            "Shelf with this name already exists".to_string(),
        ));
    }

    let shelf = Shelf::new(data.name, data.description);
    repo.create(&shelf)?;
    info!("Created shelf {} ({})", shelf.id, shelf.name);

    Ok((StatusCode::CREATED, Json(shelf)))
}

/// GET /api/shelves/{shelf_id}
pub async fn get_shelf(
    State(state): State<SharedState>,
    Path(shelf_id): Path<String>,
) -> Result<Json<Shelf>, ApiError> {
    let db = state.db()?;
    let repo = ShelfRepo::new(&db.conn);

    let shelf = repo
        .get(&shelf_id)?
        .ok_or_else(|| ApiError::NotFound("Shelf not found".to_string()))?;
    Ok(Json(shelf))
}

/// PATCH /api/shelves/{shelf_id}
pub async fn update_shelf(
    State(state): State<SharedState>,
    Path(shelf_id): Path<String>,
    Json(data): Json<ShelfUpdate>,
) -> Result<Json<Shelf>, ApiError> {
    let db = state.db()?;
    let repo = ShelfRepo::new(&db.conn);

    // Renames must stay unique
    if let Some(name) = &data.name {
        if let Some(existing) = repo.get_by_name(name)? {
            if existing.id != shelf_id {
                return Err(ApiError::Conflict(
                    "Shelf with this name already exists".to_string(),
                ));
            }
        }
    }

    let shelf = repo
        .update(&shelf_id, &data)?
        .ok_or_else(|| ApiError::NotFound("Shelf not found".to_string()))?;
    Ok(Json(shelf))
}

/// DELETE /api/shelves/{shelf_id}
pub async fn delete_shelf(
    State(state): State<SharedState>,
    Path(shelf_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db()?;
    let repo = ShelfRepo::new(&db.conn);

    if !repo.delete(&shelf_id)? {
        return Err(ApiError::NotFound("Shelf not found".to_string()));
    }

    info!("Deleted shelf {}", shelf_id);
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

/// GET /api/shelves/{shelf_id}/papers
pub async fn shelf_papers(
    State(state): State<SharedState>,
    Path(shelf_id): Path<String>,
) -> Result<Json<Vec<Paper>>, ApiError> {
    let db = state.db()?;
    let shelf_repo = ShelfRepo::new(&db.conn);

    if shelf_repo.get(&shelf_id)?.is_none() {
        return Err(ApiError::NotFound("Shelf not found".to_string()));
    }

    let paper_repo = PaperRepo::new(&db.conn);
    let query = SearchQuery {
        shelves: Some(vec![shelf_id]),
        limit: 1000,
        ..SearchQuery::new()
    };
    Ok(Json(paper_repo.search(&query)?.papers))
}
