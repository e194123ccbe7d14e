use chrono::{DateTime, Utc};

/// Default prefix for destination index names.
pub const DEFAULT_INDEX_PREFIX: &str = "api-";

/// Destination index for a record: `prefix` followed by the UTC calendar date
/// of `timestamp` as `YYYY.MM.DD`.
pub fn index_name(prefix: &str, timestamp: &DateTime<Utc>) -> String {
    format!("{prefix}{}", timestamp.format("%Y.%m.%d"))
}
