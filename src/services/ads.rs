//! NASA ADS API client for citation sync
//!
//! One search query resolves a batch of arXiv IDs to ADS records, one export
//! call fetches their BibTeX, and `sync_papers` turns both into per-paper
//! citation updates. See: https://ui.adsabs.harvard.edu/help/api/

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{CitationUpdate, Paper};
use crate::services::arxiv::normalize_arxiv_id;
use crate::services::bibtex;
use crate::utils::http::rate_limiters;

pub const ADS_API_BASE: &str = "https://api.adsabs.harvard.edu/v1";

const SEARCH_FIELDS: &str = "bibcode,doi,pub,volume,page,year,doctype,identifier,title,author";

#[derive(Debug, Error)]
pub enum AdsError {
    #[error("ADS API key not configured")]
    MissingKey,

    #[error("Invalid ADS API key")]
    InvalidKey,

    #[error("ADS rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("ADS API error: {0}")]
    Api(String),

    #[error("ADS request failed: {0}")]
    Request(String),
}

/// One document from an ADS search response
#[derive(Debug, Clone, Deserialize)]
pub struct AdsDoc {
    pub bibcode: String,
    #[serde(default)]
    pub doi: Option<Vec<String>>,
    #[serde(rename = "pub", default)]
    pub pub_venue: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub page: Option<Vec<String>>,
    #[serde(default)]
    pub doctype: Option<String>,
    #[serde(default)]
    pub identifier: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<AdsDoc>,
}

#[derive(Debug, Deserialize)]
struct ExportResponse {
    #[serde(default)]
    export: String,
}

/// Outcome counts of a sync run
#[derive(Debug, Default, Serialize)]
pub struct SyncStats {
    pub synced: u32,
    pub published: u32,
    pub not_found: u32,
    pub errors: u32,
}

/// Client for the NASA ADS API
pub struct AdsClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl AdsClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            api_base: ADS_API_BASE.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests)
    pub fn with_api_base(client: Client, api_key: String, api_base: String) -> Self {
        Self {
            client,
            api_key,
            api_base,
        }
    }

    /// Search ADS for papers by their arXiv IDs.
    ///
    /// Returns a map from arXiv ID to the matching ADS record; IDs ADS does
    /// not know are simply absent.
    pub async fn search_by_arxiv_ids(
        &self,
        arxiv_ids: &[String],
    ) -> Result<HashMap<String, AdsDoc>, AdsError> {
        if arxiv_ids.is_empty() {
            return Ok(HashMap::new());
        }

        rate_limiters::ADS.wait_for_slot("ads").await;

        let id_queries: Vec<String> = arxiv_ids.iter().map(|id| format!("arXiv:{}", id)).collect();
        let query = format!("identifier:({})", id_queries.join(" OR "));
        let rows = arxiv_ids.len().min(2000).to_string();

        debug!("ADS search for {} arXiv IDs", arxiv_ids.len());

        let resp = self
            .client
            .get(format!("{}/search/query", self.api_base))
            .query(&[
                ("q", query.as_str()),
                ("fl", SEARCH_FIELDS),
                ("rows", rows.as_str()),
            ])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdsError::Request(e.to_string()))?;

        let resp = check_status(resp)?;
        let data: SearchResponse = resp
            .json()
            .await
            .map_err(|e| AdsError::Request(format!("bad search response: {}", e)))?;

        Ok(match_identifiers(data.response.docs, arxiv_ids))
    }

    /// Get BibTeX entries for a list of ADS bibcodes, keyed by bibcode.
    pub async fn get_bibtex(&self, bibcodes: &[String]) -> Result<HashMap<String, String>, AdsError> {
        if bibcodes.is_empty() {
            return Ok(HashMap::new());
        }

        rate_limiters::ADS.wait_for_slot("ads").await;

        let resp = self
            .client
            .post(format!("{}/export/bibtex", self.api_base))
            .json(&serde_json::json!({ "bibcode": bibcodes }))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdsError::Request(e.to_string()))?;

        let resp = check_status(resp)?;
        let data: ExportResponse = resp
            .json()
            .await
            .map_err(|e| AdsError::Request(format!("bad export response: {}", e)))?;

        Ok(bibtex::split_ads_export(&data.export, bibcodes))
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, AdsError> {
    match resp.status().as_u16() {
        200 => Ok(resp),
        401 => Err(AdsError::InvalidKey),
        429 => Err(AdsError::RateLimited),
        status => Err(AdsError::Api(format!("status {}", status))),
    }
}

/// Map ADS search results back to the arXiv IDs they were requested for.
///
/// Identifiers come back as "arXiv:2301.07041" or bare IDs, possibly with a
/// version suffix; matching happens on the version-stripped base ID.
pub fn match_identifiers(docs: Vec<AdsDoc>, arxiv_ids: &[String]) -> HashMap<String, AdsDoc> {
    let mut results = HashMap::new();

    for doc in docs {
        let identifiers = doc.identifier.clone().unwrap_or_default();
        'idents: for ident in &identifiers {
            let aid = if let Some(stripped) = ident.strip_prefix("arXiv:") {
                stripped.to_string()
            } else if looks_like_arxiv_id(ident) {
                ident.clone()
            } else {
                continue;
            };

            let base_found = normalize_arxiv_id(&aid);
            for requested in arxiv_ids {
                if normalize_arxiv_id(requested) == base_found {
                    results.insert(requested.clone(), doc.clone());
                    break 'idents;
                }
            }
        }
    }

    results
}

fn looks_like_arxiv_id(ident: &str) -> bool {
    ident.contains('.') && ident.replace('.', "").chars().all(|c| c.is_ascii_digit())
}

/// Determine if an ADS record represents a journal publication rather than
/// just the arXiv preprint.
pub fn is_published(record: &AdsDoc) -> bool {
    let venue = record.pub_venue.as_deref().unwrap_or("");
    let has_doi = record.doi.as_ref().map(|d| !d.is_empty()).unwrap_or(false);

    // DOI plus a volume almost always means a journal version exists
    if has_doi && record.volume.is_some() {
        return true;
    }

    let venue_lower = venue.to_lowercase();
    if record.doctype.as_deref() == Some("article") && !venue.is_empty() {
        if !venue_lower.contains("arxiv") && venue_lower != "eprint" && venue_lower != "e-print" {
            return true;
        }
    }

    if !venue.is_empty() {
        let journals = [
            "apj",
            "mnras",
            "a&a",
            "nature",
            "science",
            "phys. rev",
            "journal",
            "monthly notices",
        ];
        if journals.iter().any(|j| venue_lower.contains(j)) {
            return true;
        }
    }

    false
}

/// Plan citation updates for a batch of papers against ADS.
///
/// Returns one `CitationUpdate` per paper (papers unknown to ADS still get
/// their sync timestamp bumped) along with run statistics. Nothing is
/// written here; the caller owns the repository.
pub async fn sync_papers(
    client: &AdsClient,
    papers: &[Paper],
) -> Result<(Vec<(String, CitationUpdate)>, SyncStats), AdsError> {
    let mut stats = SyncStats::default();
    let mut updates = Vec::with_capacity(papers.len());

    if papers.is_empty() {
        return Ok((updates, stats));
    }

    let arxiv_ids: Vec<String> = papers.iter().map(|p| p.arxiv_id.clone()).collect();
    let records = client.search_by_arxiv_ids(&arxiv_ids).await?;

    let bibcodes: Vec<String> = records.values().map(|doc| doc.bibcode.clone()).collect();
    let bibtex_map = client.get_bibtex(&bibcodes).await?;

    let now = Utc::now();

    for paper in papers {
        let Some(record) = records.get(&paper.arxiv_id) else {
            stats.not_found += 1;
            // Still stamp the sync time so the UI shows the attempt
            updates.push((
                paper.arxiv_id.clone(),
                CitationUpdate {
                    last_citation_sync: Some(now),
                    ..Default::default()
                },
            ));
            continue;
        };

        let published = is_published(record);
        let mut update = CitationUpdate {
            ads_bibcode: Some(record.bibcode.clone()),
            is_published: Some(published),
            last_citation_sync: Some(now),
            ..Default::default()
        };

        if let Some(doi) = record.doi.as_ref().and_then(|d| d.first()) {
            update.doi = Some(doi.clone());
        }

        if published {
            if let Some(journal_ref) = assemble_journal_ref(record) {
                update.journal_ref = Some(journal_ref);
            }
        }

        if let Some(ads_bibtex) = bibtex_map.get(&record.bibcode) {
            // Re-key the ADS entry to our LastName:Year format
            let entry = match &paper.cite_key {
                Some(key) => bibtex::update_cite_key(ads_bibtex, key),
                None => ads_bibtex.clone(),
            };
            update.bibtex = Some(entry);
            update.bibtex_source = Some("ads".to_string());
        }

        updates.push((paper.arxiv_id.clone(), update));
        stats.synced += 1;
        if published {
            stats.published += 1;
        }
    }

    info!(
        "ADS sync planned: {} synced, {} published, {} not found",
        stats.synced, stats.published, stats.not_found
    );

    Ok((updates, stats))
}

/// "pub, volume, page" in the style ADS shows journal references
fn assemble_journal_ref(record: &AdsDoc) -> Option<String> {
    let venue = record.pub_venue.as_deref()?;
    if venue.is_empty() {
        return None;
    }

    let mut journal_ref = venue.to_string();
    if let Some(volume) = &record.volume {
        journal_ref.push_str(&format!(", {}", volume));
    }
    if let Some(page) = record.page.as_ref().and_then(|p| p.first()) {
        if !page.is_empty() {
            journal_ref.push_str(&format!(", {}", page));
        }
    }
    Some(journal_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(bibcode: &str) -> AdsDoc {
        AdsDoc {
            bibcode: bibcode.to_string(),
            doi: None,
            pub_venue: None,
            volume: None,
            page: None,
            doctype: None,
            identifier: None,
        }
    }

    #[test]
    fn test_is_published_doi_and_volume() {
        let mut record = doc("2023ApJ...999...1M");
        record.doi = Some(vec!["10.3847/x".to_string()]);
        record.volume = Some("999".to_string());
        assert!(is_published(&record));
    }

    #[test]
    fn test_is_published_article_doctype() {
        let mut record = doc("2023ApJ...999...1M");
        record.doctype = Some("article".to_string());
        record.pub_venue = Some("The Astrophysical Journal".to_string());
        assert!(is_published(&record));

        record.pub_venue = Some("arXiv e-prints".to_string());
        assert!(!is_published(&record));
    }

    #[test]
    fn test_is_published_journal_name() {
        let mut record = doc("2024MNRAS.500...2I");
        record.pub_venue = Some("Monthly Notices of the Royal Astronomical Society".to_string());
        assert!(is_published(&record));
    }

    #[test]
    fn test_is_published_preprint_only() {
        let mut record = doc("2023arXiv230107041M");
        record.pub_venue = Some("arXiv e-prints".to_string());
        record.doctype = Some("eprint".to_string());
        assert!(!is_published(&record));
    }

    #[test]
    fn test_match_identifiers() {
        let mut found = doc("2023ApJ...999...1M");
        found.identifier = Some(vec![
            "2023ApJ...999...1M".to_string(),
            "arXiv:2301.07041".to_string(),
            "10.3847/1538-4357/x".to_string(),
        ]);

        let requested = vec!["2301.07041".to_string(), "2302.00001".to_string()];
        let results = match_identifiers(vec![found], &requested);

        assert_eq!(results.len(), 1);
        assert_eq!(results["2301.07041"].bibcode, "2023ApJ...999...1M");
        assert!(!results.contains_key("2302.00001"));
    }

    #[test]
    fn test_match_identifiers_version_suffix() {
        let mut found = doc("2023ApJ...999...1M");
        found.identifier = Some(vec!["arXiv:2301.07041v2".to_string()]);

        let requested = vec!["2301.07041".to_string()];
        let results = match_identifiers(vec![found], &requested);
        assert!(results.contains_key("2301.07041"));
    }

    #[test]
    fn test_match_identifiers_bare_id() {
        let mut found = doc("2023ApJ...999...1M");
        found.identifier = Some(vec!["2301.07041".to_string()]);

        let requested = vec!["2301.07041".to_string()];
        let results = match_identifiers(vec![found], &requested);
        assert!(results.contains_key("2301.07041"));
    }

    #[test]
    fn test_assemble_journal_ref() {
        let mut record = doc("2023ApJ...999...1M");
        record.pub_venue = Some("The Astrophysical Journal".to_string());
        record.volume = Some("999".to_string());
        record.page = Some(vec!["17".to_string()]);
        assert_eq!(
            assemble_journal_ref(&record).as_deref(),
            Some("The Astrophysical Journal, 999, 17")
        );

        let bare = doc("x");
        assert!(assemble_journal_ref(&bare).is_none());
    }
}
