//! Axum router — maps all URL paths to handlers

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{citations, pages, papers, settings, shelves, tags};
use crate::state::SharedState;

/// Upload size cap for cover images
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build and return the full Axum router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Pages
        .route("/", get(pages::index))
        .route("/library", get(pages::library))
        .route("/paper/{*arxiv_id}", get(pages::paper_detail))
        .route("/settings", get(pages::settings_page))
        // Papers
        .route("/api/papers", post(papers::add_paper).get(papers::list_papers))
        .route("/api/papers/search", get(papers::search_papers))
        .route(
            "/api/papers/{arxiv_id}",
            get(papers::get_paper)
                .patch(papers::update_paper)
                .delete(papers::delete_paper),
        )
        .route(
            "/api/papers/{arxiv_id}/cover",
            post(papers::upload_cover).delete(papers::delete_cover),
        )
        .route("/api/papers/{arxiv_id}/bibtex", get(papers::get_bibtex))
        .route(
            "/api/papers/{arxiv_id}/pdf",
            get(papers::pdf_status)
                .post(papers::download_pdf)
                .delete(papers::delete_pdf),
        )
        // Shelves
        .route(
            "/api/shelves",
            get(shelves::list_shelves).post(shelves::create_shelf),
        )
        .route(
            "/api/shelves/{shelf_id}",
            get(shelves::get_shelf)
                .patch(shelves::update_shelf)
                .delete(shelves::delete_shelf),
        )
        .route("/api/shelves/{shelf_id}/papers", get(shelves::shelf_papers))
        // Tags
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/api/tags/{name}",
            get(tags::get_tag)
                .patch(tags::update_tag_color)
                .delete(tags::delete_tag),
        )
        // Citations
        .route("/api/citations/sync", post(citations::sync_citations))
        .route("/api/citations/export", get(citations::export_bibtex))
        // Settings
        .route("/api/settings/ads-key/status", get(settings::ads_key_status))
        .route(
            "/api/settings/ads-key",
            post(settings::set_ads_key).delete(settings::delete_ads_key),
        )
        .route(
            "/api/settings/ads-key/validate",
            post(settings::validate_ads_key),
        )
        // Static files and user data
        .nest_service("/static", ServeDir::new(state.settings.static_dir.clone()))
        .nest_service("/uploads", ServeDir::new(state.settings.uploads_dir()))
        .nest_service("/pdfs", ServeDir::new(state.settings.pdf_dir()))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
