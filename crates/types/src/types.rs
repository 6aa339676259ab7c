//! Core type definitions for the tracking dashboard.
//!
//! - Identifier types (`RecordId`, `UserId`)
//! - The `Record` row served by the collection endpoint
//! - Status and sort vocabulary shared by the engine and the transports

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{TypeError, UnknownSortFieldSnafu, UnknownSortOrderSnafu, UnknownStatusSnafu};

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a string-backed identifier newtype.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serialization as a plain string; deserialization from a string or an integer
/// - `From<&str>`, `From<String>` and `From<u64>` conversions
/// - `Display` without a prefix, so the value can be embedded in URLs and keys
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from its string form.
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(value: u64) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(KeyVisitor).map(Self)
            }
        }
    };
}

/// Accepts either a JSON string or a JSON integer and yields its string form.
struct KeyVisitor;

impl de::Visitor<'_> for KeyVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_owned())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

define_key!(
    /// Opaque identifier of a tracked record.
    ///
    /// The collection endpoint may serve ids as strings or integers; both are
    /// normalized to their string form and compared as strings.
    RecordId
);

define_key!(
    /// Stable identifier of an authenticated dashboard user.
    UserId
);

// ============================================================================
// Record
// ============================================================================

/// Delivery status of a tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Shipment is on its way.
    InTransit,
    /// Shipment arrived.
    Delivered,
    /// Shipment is late.
    Delayed,
    /// Shipment was cancelled.
    Canceled,
    /// Shipment has not started yet.
    Pending,
}

impl RecordStatus {
    /// All statuses in display order.
    pub const ALL: [Self; 5] =
        [Self::InTransit, Self::Delivered, Self::Delayed, Self::Canceled, Self::Pending];

    /// Returns the wire name used by the collection endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InTransit => "InTransit",
            Self::Delivered => "Delivered",
            Self::Delayed => "Delayed",
            Self::Canceled => "Canceled",
            Self::Pending => "Pending",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatusSnafu { value: s }.build())
    }
}

/// Parses a status filter as entered in the dashboard.
///
/// An empty value or `all` means "no filter".
pub fn parse_status_filter(value: &str) -> Result<Option<RecordStatus>, TypeError> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// A tracked shipment as served by the collection endpoint.
///
/// Immutable once fetched, except `votes`, which the vote coordinator
/// updates in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Shipment start date.
    #[serde(default, with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    /// Shipment end date.
    #[serde(default, with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    /// Shipment cost.
    #[serde(default)]
    pub cost: Decimal,
    /// Delivery status.
    pub status: RecordStatus,
    /// Vote count.
    #[serde(default)]
    pub votes: u64,
}

impl Record {
    /// Case-insensitive substring match against the name and the id.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.id.as_str().to_lowercase().contains(needle)
    }
}

/// Dates arrive as `YYYY-MM-DD`, as full RFC 3339 timestamps, as empty strings or as null.
mod lenient_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Some(date));
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| Some(ts.date_naive()))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Field a record list can be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    /// Record identifier.
    #[default]
    Id,
    /// Display name.
    Name,
    /// Start date.
    StartDate,
    /// End date.
    EndDate,
    /// Cost.
    Cost,
    /// Vote count.
    Votes,
}

impl SortField {
    /// Returns the wire name used by the collection endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::Cost => "cost",
            Self::Votes => "votes",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "startDate" => Ok(Self::StartDate),
            "endDate" => Ok(Self::EndDate),
            "cost" => Ok(Self::Cost),
            "votes" => Ok(Self::Votes),
            other => UnknownSortFieldSnafu { value: other }.fail(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortOrder {
    /// Returns the wire name used by the collection endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("asc") => Ok(Self::Asc),
            v if v.eq_ignore_ascii_case("desc") => Ok(Self::Desc),
            other => UnknownSortOrderSnafu { value: other }.fail(),
        }
    }
}

/// Sort key and direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SortSpec {
    /// Field to sort by.
    pub field: SortField,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Creates a sort specification.
    pub const fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Compares two records under this sort.
    ///
    /// Ids that both parse as integers compare numerically; otherwise they
    /// compare as strings. Missing dates sort before present ones.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ordering = match self.field {
            SortField::Id => compare_ids(&a.id, &b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::StartDate => a.start_date.cmp(&b.start_date),
            SortField::EndDate => a.end_date.cmp(&b.end_date),
            SortField::Cost => a.cost.cmp(&b.cost),
            SortField::Votes => a.votes.cmp(&b.votes),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.order)
    }
}

fn compare_ids(a: &RecordId, b: &RecordId) -> Ordering {
    match (a.as_str().parse::<u64>(), b.as_str().parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.as_str().cmp(b.as_str()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> Record {
        Record {
            id: RecordId::new(id),
            name: name.to_owned(),
            start_date: None,
            end_date: None,
            cost: Decimal::ZERO,
            status: RecordStatus::Pending,
            votes: 0,
        }
    }

    #[test]
    fn test_record_id_accepts_integer_and_string() {
        let from_int: RecordId = serde_json::from_str("42").unwrap();
        let from_str: RecordId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_int, from_str);
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"42\"");
    }

    #[test]
    fn test_record_deserializes_wire_shape() {
        let json = r#"{
            "id": 7,
            "name": "Pallet of bricks",
            "startDate": "2024-03-01",
            "endDate": "2024-03-09T10:00:00Z",
            "cost": "129.50",
            "status": "InTransit",
            "votes": 3
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "7");
        assert_eq!(record.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.end_date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(record.cost, Decimal::new(12950, 2));
        assert_eq!(record.status, RecordStatus::InTransit);
        assert_eq!(record.votes, 3);
    }

    #[test]
    fn test_record_missing_optional_fields() {
        let json = r#"{"id": "a1", "name": "x", "startDate": "", "cost": 4.25, "status": "Pending"}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.start_date, None);
        assert_eq!(record.end_date, None);
        assert_eq!(record.votes, 0);
        assert_eq!(record.cost, Decimal::new(425, 2));
    }

    #[test]
    fn test_matches_search_name_and_id() {
        let r = record("TRK-0042", "Frozen Peas");
        assert!(r.matches_search("peas"));
        assert!(r.matches_search("trk-00"));
        assert!(r.matches_search(""));
        assert!(!r.matches_search("carrots"));
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("intransit".parse::<RecordStatus>().unwrap(), RecordStatus::InTransit);
        assert_eq!("Delivered".parse::<RecordStatus>().unwrap(), RecordStatus::Delivered);
        assert!("Lost".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_status_filter_all_means_none() {
        assert_eq!(parse_status_filter("").unwrap(), None);
        assert_eq!(parse_status_filter("all").unwrap(), None);
        assert_eq!(parse_status_filter("Delayed").unwrap(), Some(RecordStatus::Delayed));
    }

    #[test]
    fn test_sort_field_wire_names() {
        for field in [
            SortField::Id,
            SortField::Name,
            SortField::StartDate,
            SortField::EndDate,
            SortField::Cost,
            SortField::Votes,
        ] {
            assert_eq!(field.as_str().parse::<SortField>().unwrap(), field);
        }
        assert!("colour".parse::<SortField>().is_err());
    }

    #[test]
    fn test_sort_ids_numerically_when_possible() {
        let spec = SortSpec::new(SortField::Id, SortOrder::Asc);
        assert_eq!(spec.compare(&record("9", "a"), &record("10", "a")), Ordering::Less);
        assert_eq!(spec.compare(&record("b", "a"), &record("a", "a")), Ordering::Greater);
    }

    #[test]
    fn test_sort_desc_reverses() {
        let spec = SortSpec::new(SortField::Name, SortOrder::Desc);
        assert_eq!(spec.compare(&record("1", "alpha"), &record("2", "beta")), Ordering::Greater);
    }
}
