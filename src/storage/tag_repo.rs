//! Tag repository
//!
//! Tags are keyed by name; papers carry tag names in `tags_json`, and
//! deleting a tag scrubs it from every paper.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;
use crate::models::Tag;

/// Repository for Tag operations
pub struct TagRepo<'a> {
    conn: &'a Connection,
}

impl<'a> TagRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// List all tags in name order, with paper counts
    pub fn list(&self) -> Result<Vec<Tag>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT * FROM tags ORDER BY name")?;
        let rows = stmt.query_map([], |row| self.row_to_tag(row))?;

        let mut tags = Vec::new();
        for row in rows {
            let mut tag = row?;
            tag.paper_count = self.paper_count(&tag.name)?;
            tags.push(tag);
        }
        Ok(tags)
    }

    /// Get a tag by name
    pub fn get(&self, name: &str) -> Result<Option<Tag>, DatabaseError> {
        let result = self
            .conn
            .query_row("SELECT * FROM tags WHERE name = ?", [name], |row| {
                self.row_to_tag(row)
            });

        match result {
            Ok(mut tag) => {
                tag.paper_count = self.paper_count(&tag.name)?;
                Ok(Some(tag))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Create a tag; creating an existing name is a no-op
    pub fn create(&self, name: &str, color: Option<&str>) -> Result<Option<Tag>, DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tags (name, color) VALUES (?, ?)",
            params![name, color],
        )?;
        self.get(name)
    }

    /// Update a tag's color
    pub fn update_color(&self, name: &str, color: &str) -> Result<Option<Tag>, DatabaseError> {
        self.conn.execute(
            "UPDATE tags SET color = ? WHERE name = ?",
            params![color, name],
        )?;
        self.get(name)
    }

    /// Delete a tag and remove it from every paper's tag list
    pub fn delete(&self, name: &str) -> Result<bool, DatabaseError> {
        self.remove_from_papers(name)?;

        let count = self.conn.execute("DELETE FROM tags WHERE name = ?", [name])?;
        Ok(count > 0)
    }

    fn remove_from_papers(&self, name: &str) -> Result<(), DatabaseError> {
        let pattern = format!("%\"{}\"%", name);
        let mut stmt = self
            .conn
            .prepare("SELECT arxiv_id, tags_json FROM papers WHERE tags_json LIKE ?")?;
        let rows = stmt.query_map([&pattern], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut memberships = Vec::new();
        for row in rows {
            memberships.push(row?);
        }

        for (arxiv_id, tags_json) in memberships {
            let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
            let tags: Vec<String> = tags.into_iter().filter(|t| t != name).collect();
            self.conn.execute(
                "UPDATE papers SET tags_json = ? WHERE arxiv_id = ?",
                params![serde_json::to_string(&tags)?, arxiv_id],
            )?;
        }

        Ok(())
    }

    fn paper_count(&self, name: &str) -> Result<i64, DatabaseError> {
        let pattern = format!("%\"{}\"%", name);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM papers WHERE tags_json LIKE ?",
            [&pattern],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_tag(&self, row: &Row) -> rusqlite::Result<Tag> {
        Ok(Tag {
            name: row.get("name")?,
            color: row.get("color")?,
            paper_count: 0, // filled in by callers
        })
    }
}
