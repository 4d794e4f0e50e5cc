//! Local PDF archive
//!
//! Downloads paper PDFs from arXiv into the data directory under
//! `LastName_Year_arxivid.pdf` so the library works offline.

use chrono::Datelike;
use reqwest::Client;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::Paper;
use crate::services::bibtex::last_name;
use crate::utils::http::is_valid_pdf;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF download failed: {0}")]
    Request(String),

    #[error("arXiv returned something that is not a PDF")]
    NotPdf,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filename for a paper's archived PDF, e.g. `McCallum_2023_2301.07041.pdf`.
pub fn generate_pdf_filename(paper: &Paper) -> String {
    let name = paper
        .authors
        .first()
        .map(|a| last_name(a))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let year = paper.published.year();
    let arxiv_id = paper.arxiv_id.replace('/', "_");

    format!("{}_{}_{}.pdf", name, year, arxiv_id)
}

/// Download a paper's PDF into the archive directory.
///
/// Returns the filename; an already-archived PDF is not fetched again.
pub async fn download_pdf(
    client: &Client,
    paper: &Paper,
    pdf_dir: &Path,
) -> Result<String, PdfError> {
    let filename = generate_pdf_filename(paper);
    let filepath = pdf_dir.join(&filename);

    if filepath.exists() {
        return Ok(filename);
    }

    let resp = client
        .get(&paper.pdf_url)
        .send()
        .await
        .map_err(|e| PdfError::Request(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(PdfError::Request(format!("status {}", resp.status())));
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| PdfError::Request(e.to_string()))?;

    if !content_type.contains("pdf") && !is_valid_pdf(&bytes) {
        warn!("Download for {} is not a PDF", paper.arxiv_id);
        return Err(PdfError::NotPdf);
    }

    fs::write(&filepath, &bytes)?;
    info!("Archived PDF for {} as {}", paper.arxiv_id, filename);

    Ok(filename)
}

/// Find an archived PDF by arXiv ID by scanning the archive directory.
pub fn find_pdf(pdf_dir: &Path, arxiv_id: &str) -> Option<String> {
    let needle = arxiv_id.replace('/', "_");
    let entries = fs::read_dir(pdf_dir).ok()?;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".pdf") && name.contains(&needle) {
            return Some(name);
        }
    }
    None
}

/// Delete an archived PDF; returns whether a file was removed.
pub fn delete_pdf(pdf_dir: &Path, filename: &str) -> std::io::Result<bool> {
    let filepath = pdf_dir.join(filename);
    if filepath.exists() {
        fs::remove_file(filepath)?;
        return Ok(true);
    }
    Ok(false)
}
