//! HTML page handlers

use axum::extract::{Path, State};
use axum::response::Html;
use minijinja::context;

use crate::error::ApiError;
use crate::state::SharedState;

/// GET / - Add papers
pub async fn index(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.render("index.html", context! {})?))
}

/// GET /library - Browse papers and shelves
pub async fn library(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.render("library.html", context! {})?))
}

/// GET /paper/{arxiv_id} - Single paper detail
pub async fn paper_detail(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    Ok(Html(
        state.render("paper.html", context! { arxiv_id => arxiv_id })?,
    ))
}

/// GET /settings - Settings page
pub async fn settings_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.render("settings.html", context! {})?))
}
