//! Bulk ingestion wire format: NDJSON alternating an action line and the
//! document it applies to.

use std::collections::VecDeque;

use bytes::Bytes;
use serde::Serialize;

use crate::index::index_name;
use crate::record::Record;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Serialize)]
struct Action<'a> {
    index: IndexTarget<'a>,
}

#[derive(Serialize)]
struct IndexTarget<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

/// Serialize one record as a bulk entry: the `index` action line followed by
/// the document line, each newline-terminated.
pub fn encode_entry(record: &Record, index_prefix: &str) -> Result<Bytes, serde_json::Error> {
    let index = index_name(index_prefix, &record.timestamp);
    let action = Action {
        index: IndexTarget {
            index: &index,
            id: &record.id,
        },
    };

    let mut buf = serde_json::to_vec(&action)?;
    buf.push(b'\n');
    serde_json::to_writer(&mut buf, record)?;
    buf.push(b'\n');
    Ok(Bytes::from(buf))
}

/// Join encoded entries, in order, into one request body.
pub fn join_entries(entries: &VecDeque<Bytes>) -> Bytes {
    let size: usize = entries.iter().map(Bytes::len).sum();
    let mut body = Vec::with_capacity(size);
    for entry in entries {
        body.extend_from_slice(entry);
    }
    Bytes::from(body)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    use super::*;

    fn record(id: &str, day: u32) -> Record {
        Record::new(id, Utc.with_ymd_and_hms(2023, 6, day, 10, 0, 0).unwrap())
    }

    fn lines(body: &[u8]) -> Vec<Value> {
        std::str::from_utf8(body)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn entry_is_action_then_document() {
        let entry = encode_entry(&record("r1", 15), "api-").unwrap();

        assert!(entry.ends_with(b"\n"));
        assert_eq!(entry.iter().filter(|b| **b == b'\n').count(), 2);

        let parsed = lines(&entry);
        assert_eq!(
            parsed[0],
            json!({"index": {"_index": "api-2023.06.15", "_id": "r1"}})
        );
        assert_eq!(parsed[1]["id"], json!("r1"));
        assert_eq!(parsed[1]["@timestamp"], json!("2023-06-15T10:00:00Z"));
    }

    #[test]
    fn action_line_is_compact() {
        let entry = encode_entry(&record("r1", 15), "api-").unwrap();
        let first = std::str::from_utf8(&entry).unwrap().lines().next().unwrap();
        assert_eq!(first, r#"{"index":{"_index":"api-2023.06.15","_id":"r1"}}"#);
    }

    #[test]
    fn joined_body_preserves_order() {
        let mut entries = VecDeque::new();
        entries.push_back(encode_entry(&record("r1", 15), "api-").unwrap());
        entries.push_back(encode_entry(&record("r2", 16), "api-").unwrap());

        let body = join_entries(&entries);
        let parsed = lines(&body);

        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0]["index"]["_id"], json!("r1"));
        assert_eq!(parsed[1]["id"], json!("r1"));
        assert_eq!(parsed[2]["index"]["_id"], json!("r2"));
        assert_eq!(parsed[2]["index"]["_index"], json!("api-2023.06.16"));
        assert_eq!(parsed[3]["id"], json!("r2"));
    }

    #[test]
    fn empty_queue_joins_to_empty_body() {
        assert!(join_entries(&VecDeque::new()).is_empty());
    }
}
