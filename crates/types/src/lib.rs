//! Domain types for the tracklist list-synchronization engine.
//!
//! This crate provides the vocabulary shared by the engine and its transports:
//! - Identifier types (`RecordId`, `UserId`)
//! - The `Record` row and its `RecordStatus`
//! - Sorting (`SortField`, `SortOrder`, `SortSpec`)
//! - Query snapshots, filters, windows and pages
//! - Error types using snafu

#![deny(unsafe_code)]

pub mod error;
pub mod query;
pub mod types;

pub use error::{Result, TypeError};
pub use query::{DEFAULT_PAGE_SIZE, Page, QueryState, RecordFilter, Window};
pub use types::*;
