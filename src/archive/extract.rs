//! Archive capture -> message records.
//!
//! Every `resource` record with a JSON content type is parsed and walked
//! depth-first; each nested object that carries a message id and a non-empty
//! `rawEmail` becomes one [`MessageRecord`]. The first occurrence of an id wins.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::email::email_to_text;
use super::warc::{WarcReader, WarcRecord};
use crate::config::SiteConfig;
use crate::model::types::MessageRecord;
use crate::records;

const ID_KEYS: &[&str] = &["msgId", "messageId", "id"];
const AUTHOR_KEYS: &[&str] = &["authorName", "author", "yahooAlias", "from"];
const DATE_KEYS: &[&str] = &["postDate", "lastPosted", "date"];
const THREAD_KEYS: &[&str] = &["topicFirstRecord", "topicId"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractStats {
    pub warc_records: usize,
    pub json_resources: usize,
    pub unparsable_json: usize,
    pub messages: usize,
    pub duplicates: usize,
}

/// Collects records from a stream of WARC records.
pub struct Extractor {
    index_text_chars: usize,
    seen: HashSet<String>,
    records: Vec<MessageRecord>,
    stats: ExtractStats,
}

impl Extractor {
    pub fn new(index_text_chars: usize) -> Self {
        Self {
            index_text_chars,
            seen: HashSet::new(),
            records: Vec::new(),
            stats: ExtractStats::default(),
        }
    }

    pub fn ingest_reader<R: BufRead>(&mut self, reader: WarcReader<R>) -> Result<()> {
        for rec in reader {
            let rec = rec.context("reading archive record")?;
            self.ingest_record(&rec);
        }
        Ok(())
    }

    pub fn ingest_record(&mut self, rec: &WarcRecord) {
        self.stats.warc_records += 1;
        if rec.warc_type() != Some("resource") {
            return;
        }
        let is_json = rec
            .content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        if !is_json {
            return;
        }
        self.stats.json_resources += 1;

        let text = String::from_utf8_lossy(rec.payload());
        let data: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                self.stats.unparsable_json += 1;
                debug!(
                    uri = rec.target_uri().unwrap_or(""),
                    error = %e,
                    "skipping unparsable JSON resource"
                );
                return;
            }
        };
        self.ingest_value(&data);
    }

    /// Walk a JSON document and collect every message-shaped object in it.
    pub fn ingest_value(&mut self, data: &Value) {
        let mut objects = Vec::new();
        walk_objects(data, &mut objects);
        for obj in objects {
            let Some(record) = record_from_object(obj, self.index_text_chars) else {
                continue;
            };
            if !self.seen.insert(record.id.clone()) {
                self.stats.duplicates += 1;
                continue;
            }
            self.stats.messages += 1;
            self.records.push(record);
        }
    }

    pub fn finish(self) -> (Vec<MessageRecord>, ExtractStats) {
        (self.records, self.stats)
    }
}

/// Objects in pre-order: an object is yielded before any object nested in it.
fn walk_objects<'a>(value: &'a Value, out: &mut Vec<&'a serde_json::Map<String, Value>>) {
    match value {
        Value::Object(map) => {
            out.push(map);
            for v in map.values() {
                walk_objects(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk_objects(v, out);
            }
        }
        _ => {}
    }
}

/// Null, false, zero and the empty string count as absent.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn first_truthy<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| truthy(v))
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Unix seconds (number or numeric string) to an RFC 3339 UTC string and year.
pub fn to_iso_and_year(value: Option<&Value>) -> (Option<String>, Option<i32>) {
    let secs = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(dt) = secs.and_then(|s| DateTime::from_timestamp(s, 0)) else {
        return (None, None);
    };
    (
        Some(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        Some(dt.year()),
    )
}

fn record_from_object(
    obj: &serde_json::Map<String, Value>,
    index_text_chars: usize,
) -> Option<MessageRecord> {
    let id = value_to_id(first_truthy(obj, ID_KEYS)?);
    let raw = match obj.get("rawEmail") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => return None,
    };

    let subject = value_to_text(obj.get("subject"));
    let author = value_to_text(first_truthy(obj, AUTHOR_KEYS));
    let (timestamp, year) = to_iso_and_year(first_truthy(obj, DATE_KEYS));
    let thread_id = first_truthy(obj, THREAD_KEYS)
        .map(value_to_id)
        .unwrap_or_else(|| id.clone());

    let full_text = email_to_text(raw);
    let index_text = full_text.chars().take(index_text_chars).collect();

    Some(MessageRecord {
        id,
        thread_id,
        subject,
        author,
        timestamp,
        year,
        index_text,
        full_text,
    })
}

/// `groupsite extract`: capture file -> `messages.ndjson` + `by_year/`.
pub fn run_extract(warc_path: &Path, config: &SiteConfig) -> Result<ExtractStats> {
    info!(path = %warc_path.display(), "extracting messages from archive");
    let reader = WarcReader::open(warc_path)
        .with_context(|| format!("opening archive {}", warc_path.display()))?;

    let mut extractor = Extractor::new(config.index_text_chars);
    extractor.ingest_reader(reader)?;
    let (records, stats) = extractor.finish();

    if stats.messages == 0 {
        warn!(
            warc_records = stats.warc_records,
            json_resources = stats.json_resources,
            "no messages with rawEmail found in archive"
        );
    }

    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating {}", config.out_dir.display()))?;
    records::write_records(&config.records_path(), &records)?;
    let years = records::write_by_year(&config.by_year_dir(), &records)?;

    info!(
        component = "extract",
        messages = stats.messages,
        duplicates = stats.duplicates,
        unparsable_json = stats.unparsable_json,
        years,
        output = %config.records_path().display(),
        "wrote message records"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_are_found_and_deduplicated() {
        let data = json!({
            "result": {
                "messages": [
                    {"msgId": 1, "rawEmail": "Subject: a\n\nfirst body", "subject": " Hello ",
                     "authorName": "frank", "postDate": "1049190000", "topicId": 1},
                    {"msgId": 2, "rawEmail": "\n\nsecond", "from": "bo@x.org", "topicFirstRecord": 1},
                    {"msgId": 1, "rawEmail": "dupe"}
                ],
                "meta": {"id": 9}
            }
        });
        let mut ex = Extractor::new(1000);
        ex.ingest_value(&data);
        let (records, stats) = ex.finish();

        assert_eq!(stats.messages, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].subject, "Hello");
        assert_eq!(records[0].author, "frank");
        assert_eq!(records[0].timestamp.as_deref(), Some("2003-04-01T09:40:00Z"));
        assert_eq!(records[0].year, Some(2003));
        assert_eq!(records[0].full_text, "first body");
        assert_eq!(records[1].author, "bo@x.org");
        assert_eq!(records[1].thread_id, "1");
        assert_eq!(records[1].timestamp, None);
    }

    #[test]
    fn falsy_ids_and_missing_raw_email_are_skipped() {
        let data = json!([
            {"msgId": 0, "messageId": "", "id": null, "rawEmail": "x"},
            {"msgId": 5, "rawEmail": ""},
            {"msgId": 6}
        ]);
        let mut ex = Extractor::new(10);
        ex.ingest_value(&data);
        let (records, _) = ex.finish();
        assert!(records.is_empty());
    }

    #[test]
    fn thread_defaults_to_id_and_index_text_is_truncated() {
        let data = json!({"messageId": "abc", "rawEmail": "\n\nabcdefghijklmnop"});
        let mut ex = Extractor::new(5);
        ex.ingest_value(&data);
        let (records, _) = ex.finish();
        assert_eq!(records[0].thread_id, "abc");
        assert_eq!(records[0].index_text, "abcde");
    }

    #[test]
    fn timestamps_accept_numbers_and_reject_garbage() {
        assert_eq!(to_iso_and_year(Some(&json!(0))).1, Some(1970));
        assert_eq!(to_iso_and_year(Some(&json!(86400.7))).0.as_deref(), Some("1970-01-02T00:00:00Z"));
        assert_eq!(to_iso_and_year(Some(&json!("soon"))), (None, None));
        assert_eq!(to_iso_and_year(None), (None, None));
    }
}
