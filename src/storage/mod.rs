//! Storage module for SQLite database operations
//!
//! This module provides:
//! - Database connection management
//! - Schema migrations
//! - Repository pattern implementations for all entities

pub mod db;
pub mod paper_repo;
pub mod shelf_repo;
pub mod tag_repo;

pub use db::{open_database, open_in_memory, Database, DatabaseError};
pub use paper_repo::PaperRepo;
pub use shelf_repo::ShelfRepo;
pub use tag_repo::TagRepo;
