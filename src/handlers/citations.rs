//! Citation endpoints: ADS sync and BibTeX export

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::handlers::papers::SearchParams;
use crate::models::Paper;
use crate::services::ads::{self, AdsClient, AdsError, SyncStats};
use crate::state::SharedState;
use crate::storage::PaperRepo;

/// Upper bound when syncing or exporting "everything"
const WHOLE_LIBRARY: i64 = 100_000;

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Sync only these papers; omit to sync the whole library.
    #[serde(default)]
    pub arxiv_ids: Option<Vec<String>>,
}

/// POST /api/citations/sync - Reconcile papers against the ADS catalog
pub async fn sync_citations(
    State(state): State<SharedState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncStats>, ApiError> {
    let api_key = state
        .settings_store()
        .get_ads_api_key()
        .ok_or(AdsError::MissingKey)?;

    let papers: Vec<Paper> = {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);

        match &request.arxiv_ids {
            Some(ids) if !ids.is_empty() => {
                let mut selected = Vec::with_capacity(ids.len());
                for arxiv_id in ids {
                    let paper = repo.get(arxiv_id)?.ok_or_else(|| {
                        ApiError::NotFound(format!("Paper not found: {}", arxiv_id))
                    })?;
                    selected.push(paper);
                }
                selected
            }
            _ => repo.list_all(WHOLE_LIBRARY, 0)?,
        }
    };

    info!("Syncing {} papers with ADS", papers.len());

    let client = AdsClient::with_api_base(
        state.http.clone(),
        api_key,
        state.settings.ads_api_base.clone(),
    );
    let (updates, mut stats) = ads::sync_papers(&client, &papers).await?;

    {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);
        for (arxiv_id, update) in updates {
            if let Err(e) = repo.update_citations(&arxiv_id, &update) {
                warn!("Failed to apply sync update for {}: {}", arxiv_id, e);
                stats.errors += 1;
            }
        }
    }

    info!(
        "ADS sync finished: {} synced, {} published, {} not found, {} errors",
        stats.synced, stats.published, stats.not_found, stats.errors
    );
    Ok(Json(stats))
}

/// GET /api/citations/export - BibTeX of the filtered collection as a .bib file
pub async fn export_bibtex(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mut query = params.into_query()?;
    query.limit = WHOLE_LIBRARY;
    query.offset = 0;

    let result = {
        let db = state.db()?;
        let repo = PaperRepo::new(&db.conn);
        repo.search(&query)?
    };

    let entries: Vec<String> = result
        .papers
        .iter()
        .filter_map(|paper| paper.bibtex.clone())
        .collect();

    info!(
        "Exporting {} BibTeX entries ({} papers matched)",
        entries.len(),
        result.total
    );

    let mut body = entries.join("\n\n");
    body.push('\n');

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-bibtex; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"refsync.bib\"",
            ),
        ],
        body,
    ))
}
