//! Router-level integration tests
//!
//! These exercise the HTTP surface against a throwaway data directory.
//! Nothing here talks to arXiv or ADS; upstream-dependent paths are tested
//! up to the point where they would leave the machine.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use refsync::config::Settings;
use refsync::router::build_router;
use refsync::state::AppState;
use refsync::storage::open_database;

fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::with_data_dir(
        dir.path().to_path_buf(),
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        0,
        PathBuf::from("static"),
    );
    settings.ensure_dirs().unwrap();

    let db = open_database(&settings.database_path()).unwrap();
    let state = Arc::new(AppState::new(settings, db).unwrap());
    (build_router(state), dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn shelf_crud_flow() {
    let (app, _dir) = test_app();

    // Create
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/shelves",
            serde_json::json!({ "name": "Reading list", "description": "Queue" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let shelf = body_json(response).await;
    let shelf_id = shelf["id"].as_str().unwrap().to_string();
    assert_eq!(shelf["name"], "Reading list");
    assert_eq!(shelf["paper_count"], 0);

    // Duplicate name conflicts
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/shelves",
            serde_json::json!({ "name": "Reading list" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // List
    let response = app.clone().oneshot(get("/api/shelves")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let shelves = body_json(response).await;
    assert_eq!(shelves.as_array().unwrap().len(), 1);

    // Rename
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/shelves/{}", shelf_id),
            serde_json::json!({ "name": "Archive" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Archive");

    // Delete, then it's gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/shelves/{}", shelf_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/shelves/{}", shelf_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tag_crud_flow() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tags",
            serde_json::json!({ "name": "cosmology", "color": "#6366f1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.clone().oneshot(get("/api/tags/cosmology")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tag = body_json(response).await;
    assert_eq!(tag["color"], "#6366f1");
    assert_eq!(tag["paper_count"], 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/tags/cosmology",
            serde_json::json!({ "color": "#22c55e" }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["color"], "#22c55e");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/tags/cosmology")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/tags/cosmology")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_library_listing_and_search() {
    let (app, _dir) = test_app();

    let response = app.clone().oneshot(get("/api/papers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));

    let response = app
        .clone()
        .oneshot(get("/api/papers/search?q=halo&tags=cosmology"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["total"], 0);
    assert_eq!(result["papers"], serde_json::json!([]));
}

#[tokio::test]
async fn unknown_paper_is_404_with_detail_body() {
    let (app, _dir) = test_app();

    let response = app.clone().oneshot(get("/api/papers/2301.99999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "Paper not found");
}

#[tokio::test]
async fn add_paper_rejects_unparseable_input() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/papers",
            serde_json::json!({ "arxiv_url": "not an arxiv id" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Could not parse arXiv ID"));
}

#[tokio::test]
async fn search_rejects_invalid_status() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(get("/api/papers/search?status=skimmed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ads_key_status_starts_unconfigured() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(get("/api/settings/ads-key/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["configured"], false);
}

#[tokio::test]
async fn sync_without_key_is_rejected() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/citations/sync",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "ADS API key not configured"
    );
}

#[tokio::test]
async fn bibtex_export_is_an_attachment() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(get("/api/citations/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("refsync.bib"));
}

#[tokio::test]
async fn pages_render() {
    let (app, _dir) = test_app();

    for uri in ["/", "/library", "/settings", "/paper/2301.07041"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "page {}", uri);
        let html = body_text(response).await;
        assert!(html.contains("RefSync"), "page {}", uri);
    }
}

#[tokio::test]
async fn old_style_page_route_takes_wildcard() {
    let (app, _dir) = test_app();

    let response = app
        .clone()
        .oneshot(get("/paper/astro-ph/0601234"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("astro-ph/0601234"));
}
