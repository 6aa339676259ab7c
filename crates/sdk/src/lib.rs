//! Incremental list synchronization and optimistic vote engine.
//!
//! This crate turns a changing query (search term, status filter, sort) and a
//! stream of "load more" requests into one consistent, deduplicated, growing
//! record list, tolerating out-of-order responses, and applies reversible
//! optimistic vote toggles backed by a persistent idempotency ledger.
//!
//! # Features
//!
//! - **Race safety**: Generation-stamped fetches; superseded requests are cancelled and their
//!   responses discarded
//! - **Deduplication**: Each record id appears at most once, even across overlapping windows
//! - **Optimistic votes**: Immediate count updates, rollback on failure, one toggle per record in
//!   flight
//! - **Debounced search**: Cancel-and-replace quiet period for search edits
//! - **Pluggable transport**: Any [`RecordService`]; an HTTP implementation is included
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use tracklist_sdk::{ClientConfig, HttpRecordService, ListSession};
//!
//! #[tokio::main]
//! async fn main() -> tracklist_sdk::Result<()> {
//!     let config = ClientConfig::builder().with_base_url("http://localhost:4000").build()?;
//!     let service = Arc::new(HttpRecordService::new(config)?);
//!     let session = ListSession::builder(service).build()?;
//!
//!     session.refresh().await?;
//!     session.load_more().await?;
//!
//!     let user = "user-1".into();
//!     let first = session.snapshot().items[0].id.clone();
//!     session.toggle_vote(&first, Some(&user)).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ListSession (Public API)                   │
//! │ .set_search() │ .load_more() │ .toggle_vote() │ .snapshot() │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │ FetchCoordinator             │ MutationCoordinator          │
//! │   generation + cancellation  │   optimistic write, rollback │
//! │ CountEstimator               │   per-record submit guard    │
//! │ ListAccumulator (dedup)      │ VoteLedger (LedgerStorage)   │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                   RecordService capability                  │
//! │   HttpRecordService (reqwest + backon) │ MockRecordService  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod accumulator;
mod config;
mod count;
mod debounce;
mod error;
mod fetch;
mod generation;
mod http;
mod idempotency;
mod metrics;
pub mod mock;
mod mutation;
mod retry;
mod service;
mod session;
mod state;
mod summary;

// Public API exports
pub use accumulator::{CommitSummary, ListAccumulator};
pub use config::{ClientConfig, ClientConfigBuilder, EngineConfig, RetryPolicy, RetryPolicyBuilder};
pub use count::{CountEstimator, CountOutcome, CountTicket};
pub use debounce::Debouncer;
pub use error::{FetchPhase, Result, SdkError};
pub use fetch::{FetchCoordinator, FetchOutcome, FetchTicket, fetch};
pub use generation::{GenerationGate, Stamp};
pub use http::HttpRecordService;
pub use idempotency::{FileLedgerStorage, LedgerStorage, MemoryLedgerStorage, VoteKey, VoteLedger};
pub use crate::metrics::{EngineMetrics, MetricsEngineMetrics, NoopEngineMetrics};
pub use mutation::{MutationCoordinator, VoteOutcome, VotePlan, VoteSlot, VoteTarget};
pub use retry::with_retry;
pub use service::RecordService;
pub use session::{ListSession, ListSnapshot};
pub use state::{LoadEvent, LoadState};
pub use summary::RecordSummary;

// Re-export commonly used types from tracklist-types
pub use tracklist_types::{
    Page, QueryState, Record, RecordFilter, RecordId, RecordStatus, SortField, SortOrder,
    SortSpec, UserId, Window,
};
