//! Basic usage example against a json-server style collection.
//!
//! Run: `cargo run --example basic_usage -- --endpoint http://localhost:4000`
//!
//! This example shows:
//! - Client and engine configuration
//! - Loading the first page and paging until exhausted
//! - Changing the search term and status filter
//! - Toggling a vote and reading the confirmed count
//! - Error handling patterns

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use tracklist_sdk::{
    ClientConfig, EngineConfig, FetchOutcome, HttpRecordService, ListSession, RecordStatus, Result,
    SdkError, UserId, VoteOutcome,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let endpoint = args
        .iter()
        .position(|a| a == "--endpoint")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("http://localhost:4000");

    println!("Listing records at {endpoint}");

    // -------------------------------------------------------------------------
    // 1. Build the transport and the session
    // -------------------------------------------------------------------------
    let client = ClientConfig::builder()
        .with_base_url(endpoint)
        .with_timeout(std::time::Duration::from_secs(10))
        .build()?;
    let service = Arc::new(HttpRecordService::new(client)?);

    let session = ListSession::builder(service)
        .config(EngineConfig::builder().page_size(5).build()?)
        .build()?;

    // -------------------------------------------------------------------------
    // 2. First page, then page until the list is complete
    // -------------------------------------------------------------------------
    session.refresh().await?;
    loop {
        match session.load_more().await? {
            FetchOutcome::Committed { added, has_more } => {
                println!("loaded {added} more (has_more={has_more})");
            },
            FetchOutcome::Exhausted => break,
            other => println!("load more: {other:?}"),
        }
    }
    let snapshot = session.snapshot();
    println!("{} records, total {:?}", snapshot.items.len(), snapshot.total);

    // -------------------------------------------------------------------------
    // 3. Narrow the list
    // -------------------------------------------------------------------------
    session.set_status(Some(RecordStatus::Delayed)).await?;
    session.set_search("peas").await?;
    for record in session.snapshot().items {
        println!("  {} {} ({} votes)", record.id, record.name, record.votes);
    }

    // -------------------------------------------------------------------------
    // 4. Vote on the first record
    // -------------------------------------------------------------------------
    let user = UserId::new("example-user");
    if let Some(first) = session.snapshot().items.first() {
        match session.toggle_vote(&first.id, Some(&user)).await {
            Ok(VoteOutcome::Applied { votes, voted }) => {
                println!("vote applied: {votes} votes (voted={voted})");
            },
            Ok(other) => println!("vote skipped: {}", other.as_str()),
            Err(SdkError::MutationFailed { message, .. }) => {
                println!("vote rolled back: {message}");
            },
            Err(e) => return Err(e),
        }
    }

    // -------------------------------------------------------------------------
    // 5. Summary of what is loaded
    // -------------------------------------------------------------------------
    let summary = session.summary();
    println!("summary: {} records, total cost {}", summary.total_records, summary.total_cost);

    session.shutdown();
    Ok(())
}
