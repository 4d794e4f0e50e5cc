//! Shelf repository
//!
//! Papers reference shelves by ID in their `shelves_json` array, so deleting
//! a shelf also scrubs the ID out of every paper that carried it.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::DatabaseError;
use crate::models::{Shelf, ShelfUpdate};

/// Repository for Shelf operations
pub struct ShelfRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ShelfRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// List all shelves in name order, with paper counts
    pub fn list(&self) -> Result<Vec<Shelf>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT * FROM shelves ORDER BY name")?;
        let rows = stmt.query_map([], |row| self.row_to_shelf(row))?;

        let mut shelves = Vec::new();
        for row in rows {
            let mut shelf = row?;
            shelf.paper_count = self.paper_count(&shelf.id)?;
            shelves.push(shelf);
        }
        Ok(shelves)
    }

    /// Get a shelf by ID
    pub fn get(&self, shelf_id: &str) -> Result<Option<Shelf>, DatabaseError> {
        let result = self.conn.query_row(
            "SELECT * FROM shelves WHERE id = ?",
            [shelf_id],
            |row| self.row_to_shelf(row),
        );

        match result {
            Ok(mut shelf) => {
                shelf.paper_count = self.paper_count(&shelf.id)?;
                Ok(Some(shelf))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Get a shelf by name
    pub fn get_by_name(&self, name: &str) -> Result<Option<Shelf>, DatabaseError> {
        let result = self.conn.query_row(
            "SELECT * FROM shelves WHERE name = ?",
            [name],
            |row| self.row_to_shelf(row),
        );

        match result {
            Ok(mut shelf) => {
                shelf.paper_count = self.paper_count(&shelf.id)?;
                Ok(Some(shelf))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Create a new shelf
    pub fn create(&self, shelf: &Shelf) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO shelves (id, name, description, created_at) VALUES (?, ?, ?, ?)",
            params![
                shelf.id,
                shelf.name,
                shelf.description,
                shelf.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Update name/description
    pub fn update(&self, shelf_id: &str, data: &ShelfUpdate) -> Result<Option<Shelf>, DatabaseError> {
        if let Some(name) = &data.name {
            self.conn.execute(
                "UPDATE shelves SET name = ? WHERE id = ?",
                params![name, shelf_id],
            )?;
        }
        if let Some(description) = &data.description {
            self.conn.execute(
                "UPDATE shelves SET description = ? WHERE id = ?",
                params![description, shelf_id],
            )?;
        }
        self.get(shelf_id)
    }

    /// Delete a shelf and remove it from every paper's shelf list
    pub fn delete(&self, shelf_id: &str) -> Result<bool, DatabaseError> {
        self.remove_from_papers(shelf_id)?;

        let count = self
            .conn
            .execute("DELETE FROM shelves WHERE id = ?", [shelf_id])?;
        Ok(count > 0)
    }

    fn remove_from_papers(&self, shelf_id: &str) -> Result<(), DatabaseError> {
        let pattern = format!("%\"{}\"%", shelf_id);
        let mut stmt = self
            .conn
            .prepare("SELECT arxiv_id, shelves_json FROM papers WHERE shelves_json LIKE ?")?;
        let rows = stmt.query_map([&pattern], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut memberships = Vec::new();
        for row in rows {
            memberships.push(row?);
        }

        for (arxiv_id, shelves_json) in memberships {
            let shelves: Vec<String> = serde_json::from_str(&shelves_json).unwrap_or_default();
            let shelves: Vec<String> = shelves.into_iter().filter(|s| s != shelf_id).collect();
            self.conn.execute(
                "UPDATE papers SET shelves_json = ? WHERE arxiv_id = ?",
                params![serde_json::to_string(&shelves)?, arxiv_id],
            )?;
        }

        Ok(())
    }

    fn paper_count(&self, shelf_id: &str) -> Result<i64, DatabaseError> {
        let pattern = format!("%\"{}\"%", shelf_id);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM papers WHERE shelves_json LIKE ?",
            [&pattern],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_shelf(&self, row: &Row) -> rusqlite::Result<Shelf> {
        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Shelf {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at,
            paper_count: 0, // filled in by callers
        })
    }
}
