//! Error types for the tracklist domain vocabulary using snafu.
//!
//! Covers parsing of the values a dashboard user edits: status filters,
//! sort fields and sort directions.

use snafu::Snafu;

/// Result type for domain parsing.
pub type Result<T, E = TypeError> = std::result::Result<T, E>;

/// Errors raised while parsing domain values from their wire names.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum TypeError {
    /// The value is not one of the known record statuses.
    #[snafu(display("unknown record status '{value}'"))]
    UnknownStatus {
        /// The rejected input.
        value: String,
    },

    /// The value is not one of the sortable fields.
    #[snafu(display("unknown sort field '{value}'"))]
    UnknownSortField {
        /// The rejected input.
        value: String,
    },

    /// The value is neither `asc` nor `desc`.
    #[snafu(display("unknown sort order '{value}'"))]
    UnknownSortOrder {
        /// The rejected input.
        value: String,
    },
}
