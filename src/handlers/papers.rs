//! Paper endpoints: import, CRUD, search, covers, BibTeX, PDF archive

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Paper, PaperCreate, PaperUpdate, ReadingStatus, SearchQuery, SearchResult};
use crate::services::arxiv::ArxivClient;
use crate::services::{bibtex, pdf};
use crate::state::SharedState;
use crate::storage::PaperRepo;

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// POST /api/papers - Add a paper from an arXiv URL or ID
pub async fn add_paper(
    State(state): State<SharedState>,
    Json(data): Json<PaperCreate>,
) -> Result<(StatusCode, Json<Paper>), ApiError> {
    let client =
        ArxivClient::with_api_base(state.http.clone(), state.settings.arxiv_api_base.clone());
    let mut paper = client.fetch_paper(&data.arxiv_url).await?;

    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);

    if repo.exists(&paper.arxiv_id)? {
        return Err(ApiError::Conflict("Paper already in library".to_string()));
    }

    let existing_keys = repo.cite_keys()?;
    let cite_key = bibtex::generate_cite_key(
        &paper.authors,
        paper.published.year(),
        &paper.arxiv_id,
        &existing_keys,
    );
    paper.bibtex = Some(bibtex::generate_arxiv_bibtex(&paper, &cite_key));
    paper.cite_key = Some(cite_key);

    repo.create(&paper)?;
    info!("Added paper {} ({})", paper.arxiv_id, paper.title);

    Ok((StatusCode::CREATED, Json(paper)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/papers - List papers, newest first
pub async fn list_papers(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Paper>>, ApiError> {
    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);

    let papers = repo.list_all(params.limit.unwrap_or(50), params.offset.unwrap_or(0))?;
    Ok(Json(papers))
}

/// Query-string form of a search: comma-separated lists, plain strings
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub tags: Option<String>,
    pub shelves: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchParams {
    pub fn into_query(self) -> Result<SearchQuery, ApiError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                ReadingStatus::parse(s)
                    .ok_or_else(|| ApiError::BadRequest(format!("Invalid status: {}", s)))?,
            ),
            None => None,
        };

        Ok(SearchQuery {
            q: self.q,
            tags: self.tags.map(split_csv),
            shelves: self.shelves.map(split_csv),
            status,
            limit: self.limit.unwrap_or(50),
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn split_csv(value: String) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// GET /api/papers/search - Search papers with filters
pub async fn search_papers(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>, ApiError> {
    let query = params.into_query()?;

    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);
    Ok(Json(repo.search(&query)?))
}

/// GET /api/papers/{arxiv_id}
pub async fn get_paper(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<Paper>, ApiError> {
    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);

    let paper = repo
        .get(&arxiv_id)?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;
    Ok(Json(paper))
}

/// PATCH /api/papers/{arxiv_id} - Update shelves, tags, status, notes
pub async fn update_paper(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
    Json(data): Json<PaperUpdate>,
) -> Result<Json<Paper>, ApiError> {
    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);

    let paper = repo
        .update(&arxiv_id, &data)?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;
    Ok(Json(paper))
}

/// DELETE /api/papers/{arxiv_id}
pub async fn delete_paper(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cover_image = {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);

        let paper = repo
            .get(&arxiv_id)?
            .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;
        repo.delete(&arxiv_id)?;
        paper.cover_image
    };

    if let Some(cover) = cover_image {
        remove_cover_file(&state, &cover);
    }

    info!("Deleted paper {}", arxiv_id);
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

/// POST /api/papers/{arxiv_id}/cover - Upload a cover image
pub async fn upload_cover(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Paper>, ApiError> {
    let old_cover = {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);
        repo.get(&arxiv_id)?
            .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?
            .cover_image
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or("").to_string();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Invalid file type. Allowed: {}",
                ALLOWED_IMAGE_TYPES.join(", ")
            )));
        }

        let ext = field
            .file_name()
            .and_then(|name| name.rsplit('.').next())
            .unwrap_or("jpg")
            .to_lowercase();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Upload failed: {}", e)))?;

        upload = Some((ext, bytes.to_vec()));
        break;
    }

    let (ext, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;

    let filename = format!(
        "{}_{}.{}",
        arxiv_id.replace('/', "_"),
        &Uuid::new_v4().simple().to_string()[..8],
        ext
    );

    if let Some(old) = old_cover {
        remove_cover_file(&state, &old);
    }

    fs::write(state.settings.uploads_dir().join(&filename), &bytes)?;

    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);
    let paper = repo
        .set_cover(&arxiv_id, Some(filename.as_str()))?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;

    info!("Set cover for {} to {}", arxiv_id, filename);
    Ok(Json(paper))
}

/// DELETE /api/papers/{arxiv_id}/cover
pub async fn delete_cover(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<Paper>, ApiError> {
    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);

    let paper = repo
        .get(&arxiv_id)?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;

    if let Some(cover) = &paper.cover_image {
        remove_cover_file(&state, cover);
    }

    let paper = repo
        .set_cover(&arxiv_id, None)?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;
    Ok(Json(paper))
}

fn remove_cover_file(state: &SharedState, filename: &str) {
    let path = state.settings.uploads_dir().join(filename);
    if path.exists() {
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("Failed to remove cover {:?}: {}", path, e);
        }
    }
}

/// GET /api/papers/{arxiv_id}/bibtex - The stored BibTeX entry as text
pub async fn get_bibtex(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db()?;
    let repo = PaperRepo::new(&db.conn);

    let paper = repo
        .get(&arxiv_id)?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;

    let bibtex = paper
        .bibtex
        .ok_or_else(|| ApiError::NotFound("Paper has no BibTeX entry".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        bibtex,
    ))
}

#[derive(Debug, Serialize)]
pub struct PdfStatus {
    pub filename: Option<String>,
}

/// GET /api/papers/{arxiv_id}/pdf - Is there a locally archived PDF?
pub async fn pdf_status(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<PdfStatus>, ApiError> {
    {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);
        if !repo.exists(&arxiv_id)? {
            return Err(ApiError::NotFound("Paper not found".to_string()));
        }
    }

    let filename = pdf::find_pdf(&state.settings.pdf_dir(), &arxiv_id);
    Ok(Json(PdfStatus { filename }))
}

/// POST /api/papers/{arxiv_id}/pdf - Download the PDF into the local archive
pub async fn download_pdf(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<PdfStatus>, ApiError> {
    let paper = {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);
        repo.get(&arxiv_id)?
            .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?
    };

    let filename = pdf::download_pdf(&state.http, &paper, &state.settings.pdf_dir()).await?;
    Ok(Json(PdfStatus {
        filename: Some(filename),
    }))
}

/// DELETE /api/papers/{arxiv_id}/pdf
pub async fn delete_pdf(
    State(state): State<SharedState>,
    Path(arxiv_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pdf_dir = state.settings.pdf_dir();
    let filename = pdf::find_pdf(&pdf_dir, &arxiv_id)
        .ok_or_else(|| ApiError::NotFound("No archived PDF for this paper".to_string()))?;

    pdf::delete_pdf(&pdf_dir, &filename)?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
