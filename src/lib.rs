//! docsift - PDF keyword indexing and faceted search
//!
//! This crate provides:
//! - An ingestion pipeline that turns PDFs into a keyword inverted index plus metadata
//! - A query engine that intersects posting lists and filters on facets
//! - Batched index maintenance and an append-only ingestion audit log
//! - A SQLite backend and the CLI commands built on top of it

pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod keywords;
pub mod maintenance;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
