//! Service layer: upstream API clients and citation plumbing

pub mod ads;
pub mod arxiv;
pub mod bibtex;
pub mod latex;
pub mod pdf;
pub mod settings_store;
