use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelf {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paper_count: i64,
}

impl Shelf {
    pub fn new(name: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string()[..8].to_string(),
            name,
            description,
            created_at: Utc::now(),
            paper_count: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShelfCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShelfUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}
