//! arXiv API client
//!
//! Fetches paper metadata from arXiv's Atom API.
//! See: https://arxiv.org/help/api/

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Paper;
use crate::services::latex::latex_to_text;
use crate::utils::http::{rate_limiters, with_retry, RetryConfig};

pub const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";

const USER_AGENT: &str = "RefSync/0.1 (academic citation manager)";

// arXiv ID forms, new (2301.07041, optionally versioned) and old
// (astro-ph/0601234), bare or embedded in an abs/pdf URL
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)arxiv\.org/abs/(\d{4}\.\d{4,5}(?:v\d+)?)").unwrap(),
        Regex::new(r"(?i)arxiv\.org/pdf/(\d{4}\.\d{4,5}(?:v\d+)?)").unwrap(),
        Regex::new(r"(?i)arxiv\.org/abs/([a-z-]+/\d{7}(?:v\d+)?)").unwrap(),
        Regex::new(r"^(\d{4}\.\d{4,5}(?:v\d+)?)$").unwrap(),
        Regex::new(r"^([a-z-]+/\d{7}(?:v\d+)?)$").unwrap(),
    ]
});

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"v\d+$").unwrap());

#[derive(Debug, Error)]
pub enum ArxivError {
    #[error("Could not parse arXiv ID from: {0}")]
    InvalidId(String),

    #[error("No paper found with ID: {0}")]
    NotFound(String),

    #[error("Failed to fetch from arXiv API: {0}")]
    Request(String),

    #[error("Failed to parse arXiv response: {0}")]
    Parse(String),
}

/// Extract an arXiv ID from a URL or raw ID string.
pub fn parse_arxiv_id(url_or_id: &str) -> Option<String> {
    let input = url_or_id.trim();
    for pattern in ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(input) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Remove a version suffix if present (2301.07041v2 -> 2301.07041).
pub fn normalize_arxiv_id(arxiv_id: &str) -> String {
    VERSION_SUFFIX.replace(arxiv_id, "").into_owned()
}

/// Client for the arXiv API
pub struct ArxivClient {
    client: Client,
    api_base: String,
}

impl ArxivClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api_base: ARXIV_API_BASE.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests)
    pub fn with_api_base(client: Client, api_base: String) -> Self {
        Self { client, api_base }
    }

    /// Fetch paper metadata for an arXiv URL or ID.
    ///
    /// The returned paper has its title and abstract de-LaTeXed and its
    /// URLs filled in; cite key and BibTeX are left for the caller, which
    /// knows the library's existing keys.
    pub async fn fetch_paper(&self, url_or_id: &str) -> Result<Paper, ArxivError> {
        let arxiv_id = parse_arxiv_id(url_or_id)
            .ok_or_else(|| ArxivError::InvalidId(url_or_id.to_string()))?;
        let base_id = normalize_arxiv_id(&arxiv_id);

        // arXiv asks for 3-second spacing between API requests
        rate_limiters::ARXIV.wait_for_slot("arxiv").await;

        let api_url = format!(
            "{}?id_list={}",
            self.api_base,
            urlencoding::encode(&arxiv_id)
        );
        debug!("arXiv lookup for ID: {}", arxiv_id);

        let retry_config = RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_secs(3),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        };

        let client = self.client.clone();
        let api_url_owned = api_url.clone();

        let body = with_retry(
            &retry_config,
            &format!("arXiv lookup for {}", arxiv_id),
            || {
                let client = client.clone();
                let url = api_url_owned.clone();
                async move {
                    let resp = client
                        .get(&url)
                        .header("User-Agent", USER_AGENT)
                        .send()
                        .await
                        .map_err(|e| format!("request failed: {}", e))?;

                    if !resp.status().is_success() {
                        return Err(format!("status: {}", resp.status()));
                    }

                    resp.text()
                        .await
                        .map_err(|e| format!("read failed: {}", e))
                }
            },
            |err| {
                err.contains("request failed")
                    || err.contains("status: 5")
                    || err.contains("status: 429")
            },
        )
        .await
        .map_err(ArxivError::Request)?;

        let entry = parse_atom(&body)
            .into_iter()
            .next()
            .ok_or_else(|| ArxivError::NotFound(arxiv_id.clone()))?;

        // The API reports bad IDs as an entry titled "Error"
        if entry.title == "Error" && !entry.id_url.contains("/abs/") {
            warn!("arXiv API error for {}: {}", arxiv_id, entry.summary);
            return Err(ArxivError::NotFound(arxiv_id));
        }

        entry_to_paper(entry, &base_id)
    }
}

/// One parsed `<entry>` of an arXiv Atom feed
#[derive(Debug, Default)]
struct AtomEntry {
    id_url: String,
    title: String,
    summary: String,
    published: Option<String>,
    updated: Option<String>,
    authors: Vec<String>,
    categories: Vec<String>,
    primary_category: Option<String>,
    doi: Option<String>,
    journal_ref: Option<String>,
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

/// Parse the entries of an arXiv Atom feed.
///
/// quick-xml event parsing; Atom namespaces make regex scraping brittle.
fn parse_atom(body: &str) -> Vec<AtomEntry> {
    let mut reader = quick_xml::Reader::from_reader(body.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut entries: Vec<AtomEntry> = Vec::new();
    let mut cur = AtomEntry::default();
    let mut in_entry = false;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    "entry" => {
                        cur = AtomEntry::default();
                        in_entry = true;
                    }
                    "author" if in_entry => in_author = true,
                    "category" if in_entry => {
                        if let Some(term) = attr_value(&e, "term") {
                            cur.categories.push(term);
                        }
                    }
                    "primary_category" if in_entry => {
                        cur.primary_category = attr_value(&e, "term");
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match local_name(&name) {
                    "category" if in_entry => {
                        if let Some(term) = attr_value(&e, "term") {
                            cur.categories.push(term);
                        }
                    }
                    "primary_category" if in_entry => {
                        cur.primary_category = attr_value(&e, "term");
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let Ok(unescaped) = t.unescape() {
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let value = text.trim().to_string();
                if in_entry {
                    match local_name(&name) {
                        "id" => cur.id_url = value,
                        "title" => cur.title = value,
                        "summary" => cur.summary = value,
                        "published" => cur.published = non_empty(value),
                        "updated" => cur.updated = non_empty(value),
                        "name" if in_author => {
                            if !value.is_empty() {
                                cur.authors.push(value);
                            }
                        }
                        "doi" => cur.doi = non_empty(value),
                        "journal_ref" => cur.journal_ref = non_empty(value),
                        "author" => in_author = false,
                        "entry" => {
                            in_entry = false;
                            entries.push(std::mem::take(&mut cur));
                        }
                        _ => {}
                    }
                }
                text.clear();
            }
            Err(e) => {
                warn!("arXiv feed parse stopped early: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    entries
}

fn attr_value(e: &quick_xml::events::BytesStart, key: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if String::from_utf8_lossy(attr.key.as_ref()) == key {
            let value = attr.unescape_value().map(|v| v.to_string()).ok()?;
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
    }
    None
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn entry_to_paper(entry: AtomEntry, base_id: &str) -> Result<Paper, ArxivError> {
    let published = parse_date(entry.published.as_deref(), base_id)?;
    let updated = match entry.updated.as_deref() {
        Some(s) => parse_date(Some(s), base_id)?,
        None => published,
    };

    // Prefer the ID the API echoed back (it carries the version)
    let clean_id = entry
        .id_url
        .split("/abs/")
        .nth(1)
        .map(|s| s.trim_matches('/').to_string())
        .unwrap_or_else(|| base_id.to_string());

    let mut categories = entry.categories;
    if categories.is_empty() {
        categories.push(
            entry
                .primary_category
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        );
    }

    let mut paper = Paper::new(base_id.to_string(), latex_to_text(&entry.title));
    paper.authors = entry.authors;
    paper.r#abstract = latex_to_text(&entry.summary);
    paper.categories = categories;
    paper.published = published;
    paper.updated = updated;
    paper.arxiv_url = format!("https://arxiv.org/abs/{}", clean_id);
    paper.pdf_url = format!("https://arxiv.org/pdf/{}.pdf", clean_id);
    paper.doi = entry.doi;
    paper.journal_ref = entry.journal_ref;

    Ok(paper)
}

fn parse_date(value: Option<&str>, arxiv_id: &str) -> Result<DateTime<Utc>, ArxivError> {
    let value = value.ok_or_else(|| {
        ArxivError::Parse(format!("missing timestamp in feed entry for {}", arxiv_id))
    })?;
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ArxivError::Parse(format!("bad timestamp {:?} for {}: {}", value, arxiv_id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_arxiv_id() {
        // New format
        assert_eq!(parse_arxiv_id("2301.07041"), Some("2301.07041".to_string()));
        assert_eq!(
            parse_arxiv_id("https://arxiv.org/abs/2301.07041"),
            Some("2301.07041".to_string())
        );
        assert_eq!(
            parse_arxiv_id("https://arxiv.org/pdf/2301.07041v2"),
            Some("2301.07041v2".to_string())
        );

        // Old format
        assert_eq!(
            parse_arxiv_id("astro-ph/0601234"),
            Some("astro-ph/0601234".to_string())
        );
        assert_eq!(
            parse_arxiv_id("https://arxiv.org/abs/astro-ph/0601234"),
            Some("astro-ph/0601234".to_string())
        );

        // With version
        assert_eq!(
            parse_arxiv_id("2301.07041v3"),
            Some("2301.07041v3".to_string())
        );

        // Invalid
        assert_eq!(parse_arxiv_id("not-an-arxiv-id"), None);
        assert_eq!(parse_arxiv_id("https://example.com/paper.pdf"), None);
    }

    #[test]
    fn test_normalize_arxiv_id() {
        assert_eq!(normalize_arxiv_id("2301.07041v2"), "2301.07041");
        assert_eq!(normalize_arxiv_id("2301.07041"), "2301.07041");
        assert_eq!(normalize_arxiv_id("astro-ph/0601234v1"), "astro-ph/0601234");
    }

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2301.07041v2</id>
    <updated>2023-03-01T10:00:00Z</updated>
    <published>2023-01-17T18:59:59Z</published>
    <title>Dark Matter Halos with $\sigma_8$ Tension</title>
    <summary>  We study halo
 assembly bias.  </summary>
    <author><name>Jane McCallum</name></author>
    <author><name>Ravi Iyer</name><arxiv:affiliation>Example Univ</arxiv:affiliation></author>
    <arxiv:doi>10.3847/1538-4357/test</arxiv:doi>
    <arxiv:journal_ref>ApJ 999, 1</arxiv:journal_ref>
    <arxiv:primary_category term="astro-ph.CO"/>
    <category term="astro-ph.CO" scheme="http://arxiv.org/schemas/atom"/>
    <category term="astro-ph.GA" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom() {
        let entries = parse_atom(SAMPLE_FEED);
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id_url, "http://arxiv.org/abs/2301.07041v2");
        assert_eq!(entry.authors, vec!["Jane McCallum", "Ravi Iyer"]);
        assert_eq!(entry.categories, vec!["astro-ph.CO", "astro-ph.GA"]);
        assert_eq!(entry.primary_category.as_deref(), Some("astro-ph.CO"));
        assert_eq!(entry.doi.as_deref(), Some("10.3847/1538-4357/test"));
        assert_eq!(entry.journal_ref.as_deref(), Some("ApJ 999, 1"));
    }

    #[test]
    fn test_entry_to_paper() {
        let entry = parse_atom(SAMPLE_FEED).into_iter().next().unwrap();
        let paper = entry_to_paper(entry, "2301.07041").unwrap();

        assert_eq!(paper.arxiv_id, "2301.07041");
        assert!(paper.title.contains(r"$\sigma_8$"));
        assert_eq!(paper.r#abstract, "We study halo assembly bias.");
        assert_eq!(paper.published.year(), 2023);
        assert_eq!(paper.arxiv_url, "https://arxiv.org/abs/2301.07041v2");
        assert_eq!(paper.pdf_url, "https://arxiv.org/pdf/2301.07041v2.pdf");
        assert_eq!(paper.doi.as_deref(), Some("10.3847/1538-4357/test"));
    }

    #[test]
    fn test_parse_atom_empty_feed() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
        assert!(parse_atom(feed).is_empty());
    }
}
