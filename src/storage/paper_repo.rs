//! Paper repository for database operations on papers

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, ToSql};
use std::collections::HashSet;

use super::DatabaseError;
use crate::models::{CitationUpdate, Paper, PaperUpdate, ReadingStatus, SearchQuery, SearchResult};

/// Repository for Paper operations
pub struct PaperRepo<'a> {
    conn: &'a Connection,
}

impl<'a> PaperRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a paper by arXiv ID
    pub fn get(&self, arxiv_id: &str) -> Result<Option<Paper>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT * FROM papers WHERE arxiv_id = ?")?;

        let result = stmt.query_row([arxiv_id], |row| self.row_to_paper(row));

        match result {
            Ok(paper) => Ok(Some(paper)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Check if a paper exists
    pub fn exists(&self, arxiv_id: &str) -> Result<bool, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM papers WHERE arxiv_id = ?",
            [arxiv_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new paper
    pub fn create(&self, paper: &Paper) -> Result<(), DatabaseError> {
        let authors_json = serde_json::to_string(&paper.authors)?;
        let categories_json = serde_json::to_string(&paper.categories)?;
        let shelves_json = serde_json::to_string(&paper.shelves)?;
        let tags_json = serde_json::to_string(&paper.tags)?;

        self.conn.execute(
            "INSERT INTO papers (
                arxiv_id, title, authors_json, abstract, categories_json,
                published, updated, pdf_url, arxiv_url,
                shelves_json, tags_json, status, starred, notes, cover_image, added_at,
                bibtex, bibtex_source, cite_key, is_published, doi, journal_ref,
                ads_bibcode, last_citation_sync
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                paper.arxiv_id,
                paper.title,
                authors_json,
                paper.r#abstract,
                categories_json,
                paper.published.to_rfc3339(),
                paper.updated.to_rfc3339(),
                paper.pdf_url,
                paper.arxiv_url,
                shelves_json,
                tags_json,
                paper.status.as_str(),
                paper.starred as i32,
                paper.notes,
                paper.cover_image,
                paper.added_at.to_rfc3339(),
                paper.bibtex,
                paper.bibtex_source,
                paper.cite_key,
                paper.is_published as i32,
                paper.doi,
                paper.journal_ref,
                paper.ads_bibcode,
                paper.last_citation_sync.map(|d| d.to_rfc3339()),
            ],
        )?;

        Ok(())
    }

    /// Update user-editable fields; fields absent from `data` are untouched.
    pub fn update(&self, arxiv_id: &str, data: &PaperUpdate) -> Result<Option<Paper>, DatabaseError> {
        if !self.exists(arxiv_id)? {
            return Ok(None);
        }

        let mut updates: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(shelves) = &data.shelves {
            updates.push("shelves_json = ?");
            values.push(Box::new(serde_json::to_string(shelves)?));
        }
        if let Some(tags) = &data.tags {
            updates.push("tags_json = ?");
            values.push(Box::new(serde_json::to_string(tags)?));
        }
        if let Some(status) = data.status {
            updates.push("status = ?");
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(starred) = data.starred {
            updates.push("starred = ?");
            values.push(Box::new(starred as i32));
        }
        if let Some(notes) = &data.notes {
            updates.push("notes = ?");
            values.push(Box::new(notes.clone()));
        }

        if !updates.is_empty() {
            values.push(Box::new(arxiv_id.to_string()));
            let sql = format!("UPDATE papers SET {} WHERE arxiv_id = ?", updates.join(", "));
            let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            self.conn.execute(&sql, refs.as_slice())?;
        }

        self.get(arxiv_id)
    }

    /// Apply citation fields from an ADS sync; user annotations are untouched.
    pub fn update_citations(
        &self,
        arxiv_id: &str,
        data: &CitationUpdate,
    ) -> Result<(), DatabaseError> {
        let mut updates: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(bibcode) = &data.ads_bibcode {
            updates.push("ads_bibcode = ?");
            values.push(Box::new(bibcode.clone()));
        }
        if let Some(is_published) = data.is_published {
            updates.push("is_published = ?");
            values.push(Box::new(is_published as i32));
        }
        if let Some(doi) = &data.doi {
            updates.push("doi = ?");
            values.push(Box::new(doi.clone()));
        }
        if let Some(journal_ref) = &data.journal_ref {
            updates.push("journal_ref = ?");
            values.push(Box::new(journal_ref.clone()));
        }
        if let Some(bibtex) = &data.bibtex {
            updates.push("bibtex = ?");
            values.push(Box::new(bibtex.clone()));
        }
        if let Some(source) = &data.bibtex_source {
            updates.push("bibtex_source = ?");
            values.push(Box::new(source.clone()));
        }
        if let Some(synced) = data.last_citation_sync {
            updates.push("last_citation_sync = ?");
            values.push(Box::new(synced.to_rfc3339()));
        }

        if !updates.is_empty() {
            values.push(Box::new(arxiv_id.to_string()));
            let sql = format!("UPDATE papers SET {} WHERE arxiv_id = ?", updates.join(", "));
            let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            self.conn.execute(&sql, refs.as_slice())?;
        }

        Ok(())
    }

    /// Set or clear the cover image filename
    pub fn set_cover(
        &self,
        arxiv_id: &str,
        cover_image: Option<&str>,
    ) -> Result<Option<Paper>, DatabaseError> {
        self.conn.execute(
            "UPDATE papers SET cover_image = ? WHERE arxiv_id = ?",
            params![cover_image, arxiv_id],
        )?;
        self.get(arxiv_id)
    }

    /// Delete a paper
    pub fn delete(&self, arxiv_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn
            .execute("DELETE FROM papers WHERE arxiv_id = ?", [arxiv_id])?;
        Ok(count > 0)
    }

    /// List papers, newest first
    pub fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Paper>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM papers ORDER BY added_at DESC LIMIT ? OFFSET ?",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| self.row_to_paper(row))?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(row?);
        }
        Ok(papers)
    }

    /// Search papers with optional full-text query and filters
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult, DatabaseError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut owned: Vec<String> = Vec::new();

        if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
            conditions.push(
                "arxiv_id IN (SELECT arxiv_id FROM papers_fts WHERE papers_fts MATCH ?)"
                    .to_string(),
            );
            // Quote the term so FTS operators in user input are inert
            owned.push(format!("\"{}\"", q.replace('"', "\"\"")));
        }

        if let Some(tags) = &query.tags {
            for tag in tags {
                conditions.push("tags_json LIKE ?".to_string());
                owned.push(format!("%\"{}\"%", tag));
            }
        }

        if let Some(shelves) = &query.shelves {
            for shelf in shelves {
                conditions.push("shelves_json LIKE ?".to_string());
                owned.push(format!("%\"{}\"%", shelf));
            }
        }

        if let Some(status) = query.status {
            if status != ReadingStatus::Unset {
                conditions.push("status = ?".to_string());
                owned.push(status.as_str().to_string());
            }
        }

        let where_clause = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };

        let filter_params: Vec<&dyn ToSql> = owned.iter().map(|s| s as &dyn ToSql).collect();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM papers WHERE {}", where_clause),
            filter_params.as_slice(),
            |row| row.get(0),
        )?;

        let mut page_params = filter_params.clone();
        page_params.push(&query.limit);
        page_params.push(&query.offset);

        let sql = format!(
            "SELECT * FROM papers WHERE {} ORDER BY added_at DESC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(page_params.as_slice(), |row| self.row_to_paper(row))?;

        let mut papers = Vec::new();
        for row in rows {
            papers.push(row?);
        }

        Ok(SearchResult { papers, total })
    }

    /// All cite keys currently in the library (collision avoidance)
    pub fn cite_keys(&self) -> Result<HashSet<String>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT cite_key FROM papers WHERE cite_key IS NOT NULL")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(row?);
        }
        Ok(keys)
    }

    fn row_to_paper(&self, row: &Row) -> rusqlite::Result<Paper> {
        let authors_json: String = row.get("authors_json")?;
        let authors: Vec<String> = serde_json::from_str(&authors_json).unwrap_or_default();

        let categories_json: String = row.get("categories_json")?;
        let categories: Vec<String> = serde_json::from_str(&categories_json).unwrap_or_default();

        let shelves_json: String = row.get("shelves_json")?;
        let shelves: Vec<String> = serde_json::from_str(&shelves_json).unwrap_or_default();

        let tags_json: String = row.get("tags_json")?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

        let status_str: String = row.get("status")?;
        let status = ReadingStatus::parse(&status_str).unwrap_or_default();

        Ok(Paper {
            arxiv_id: row.get("arxiv_id")?,
            title: row.get("title")?,
            authors,
            r#abstract: row.get("abstract")?,
            categories,
            published: parse_datetime(row.get::<_, String>("published")?),
            updated: parse_datetime(row.get::<_, String>("updated")?),
            pdf_url: row.get("pdf_url")?,
            arxiv_url: row.get("arxiv_url")?,
            shelves,
            tags,
            status,
            starred: row.get::<_, i32>("starred")? != 0,
            notes: row.get("notes")?,
            cover_image: row.get("cover_image")?,
            added_at: parse_datetime(row.get::<_, String>("added_at")?),
            bibtex: row.get("bibtex")?,
            bibtex_source: row.get("bibtex_source")?,
            cite_key: row.get("cite_key")?,
            is_published: row.get::<_, i32>("is_published")? != 0,
            doi: row.get("doi")?,
            journal_ref: row.get("journal_ref")?,
            ads_bibcode: row.get("ads_bibcode")?,
            last_citation_sync: row
                .get::<_, Option<String>>("last_citation_sync")?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|d| d.with_timezone(&Utc)),
        })
    }
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
