use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: Option<String>,
    #[serde(default)]
    pub paper_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct TagCreate {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagColorUpdate {
    pub color: String,
}
