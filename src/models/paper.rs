use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReadingStatus {
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "to-read")]
    ToRead,
    #[serde(rename = "")]
    #[default]
    Unset,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Read => "read",
            ReadingStatus::ToRead => "to-read",
            ReadingStatus::Unset => "",
        }
    }

    pub fn parse(s: &str) -> Option<ReadingStatus> {
        match s {
            "read" => Some(ReadingStatus::Read),
            "to-read" => Some(ReadingStatus::ToRead),
            "" => Some(ReadingStatus::Unset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub r#abstract: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub pdf_url: String,
    pub arxiv_url: String,

    #[serde(default)]
    pub shelves: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ReadingStatus,
    #[serde(default)]
    pub starred: bool,
    pub notes: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,

    pub bibtex: Option<String>,
    #[serde(default = "default_bibtex_source")]
    pub bibtex_source: String,
    pub cite_key: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub ads_bibcode: Option<String>,
    pub last_citation_sync: Option<DateTime<Utc>>,
}

fn default_bibtex_source() -> String {
    "arxiv".to_string()
}

impl Paper {
    pub fn new(arxiv_id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            arxiv_id,
            title,
            authors: Vec::new(),
            r#abstract: String::new(),
            categories: Vec::new(),
            published: now,
            updated: now,
            pdf_url: String::new(),
            arxiv_url: String::new(),
            shelves: Vec::new(),
            tags: Vec::new(),
            status: ReadingStatus::Unset,
            starred: false,
            notes: None,
            cover_image: None,
            added_at: now,
            bibtex: None,
            bibtex_source: default_bibtex_source(),
            cite_key: None,
            is_published: false,
            doi: None,
            journal_ref: None,
            ads_bibcode: None,
            last_citation_sync: None,
        }
    }

    pub fn authors_str(&self) -> String {
        self.authors.join(", ")
    }
}

/// Request to add a paper - just needs the URL or ID.
#[derive(Debug, Deserialize)]
pub struct PaperCreate {
    pub arxiv_url: String,
}

/// User-editable paper metadata; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct PaperUpdate {
    pub shelves: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ReadingStatus>,
    pub starred: Option<bool>,
    pub notes: Option<String>,
}

/// Citation fields written by ADS sync; user annotations are never part of this.
#[derive(Debug, Clone, Default)]
pub struct CitationUpdate {
    pub ads_bibcode: Option<String>,
    pub is_published: Option<bool>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub bibtex: Option<String>,
    pub bibtex_source: Option<String>,
    pub last_citation_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub tags: Option<Vec<String>>,
    pub shelves: Option<Vec<String>>,
    pub status: Option<ReadingStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self {
            limit: 50,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub papers: Vec<Paper>,
    pub total: i64,
}
