//! `groupsite find-files`: locate attachments and file links.
//!
//! Two sources:
//! - per-year NDJSON: explicit `attachments`/`files`/`enclosures` lists and
//!   body URLs that look like file links;
//! - WARC captures under the data directory: `response` records whose HTTP
//!   `Content-Type` is not `text/*`.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::archive::WarcReader;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s"'<>]+"#).expect("url regex"));
static FILE_EXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:zip|tar|tgz|gz|rar|7z|pdf|docx?|xlsx?|pptx?|jpg|jpeg|png|gif|mp3|wav|exe|bin)(?:[?#/]|$)")
        .expect("file extension regex")
});

const LIST_KEYS: [&str; 3] = ["attachments", "files", "enclosures"];
const BODY_KEYS: [&str; 8] = ["full_text", "index_text", "html", "body", "text", "content", "raw", "message"];
const ID_KEYS: [&str; 3] = ["id", "_id", "message-id"];

/// One discovered file, printed as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FileCandidate {
    /// Listed explicitly on a message.
    Listed {
        message: String,
        meta_key: String,
        file: Value,
        raw: Value,
    },
    /// URL in a message body that looks like a file link.
    BodyUrl { message: String, candidate_url: String },
    /// Non-text HTTP response captured in a WARC file.
    Warc {
        warc_file: String,
        uri: String,
        content_type: String,
        content_disposition: String,
        size: usize,
        sha256: String,
    },
}

/// True for URLs worth reporting: a known file extension, an attachments
/// path, or a link back to the original group host.
pub fn looks_like_file_url(url: &str) -> bool {
    FILE_EXT_RE.is_match(url) || url.contains("/attachments/") || url.contains("groups.yahoo.com")
}

fn message_id(obj: &Value) -> String {
    ID_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Candidates from one NDJSON object.
pub fn scan_message(obj: &Value) -> Vec<FileCandidate> {
    let mid = message_id(obj);
    let mut out = Vec::new();
    for key in LIST_KEYS {
        let Some(Value::Array(items)) = obj.get(key) else {
            continue;
        };
        for item in items {
            let file = match item {
                Value::Object(map) => map
                    .get("filename")
                    .or_else(|| map.get("url"))
                    .cloned()
                    .unwrap_or_else(|| item.clone()),
                other => other.clone(),
            };
            out.push(FileCandidate::Listed {
                message: mid.clone(),
                meta_key: key.to_string(),
                file,
                raw: item.clone(),
            });
        }
    }

    let bodies: Vec<&str> = BODY_KEYS
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .collect();
    let joined = bodies.join("\n");
    let urls: BTreeSet<&str> = URL_RE.find_iter(&joined).map(|m| m.as_str()).collect();
    out.extend(urls.into_iter().filter(|u| looks_like_file_url(u)).map(|u| FileCandidate::BodyUrl {
        message: mid.clone(),
        candidate_url: u.to_string(),
    }));
    out
}

fn sorted_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_name().and_then(|n| n.to_str()).is_some_and(&keep))
        .collect();
    files.sort();
    Ok(files)
}

/// Scan `by_year/*.ndjson`. Unparseable lines are skipped.
pub fn scan_ndjson_dir(dir: &Path, emit: &mut dyn FnMut(FileCandidate) -> Result<()>) -> Result<usize> {
    if !dir.is_dir() {
        warn!(component = "find_files", dir = %dir.display(), "per-year NDJSON directory not found");
        return Ok(0);
    }
    let mut found = 0;
    for path in sorted_files(dir, |n| n.ends_with(".ndjson"))? {
        let file = std::fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("reading {}", path.display()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(obj) = serde_json::from_str::<Value>(line) else {
                continue;
            };
            for candidate in scan_message(&obj) {
                emit(candidate)?;
                found += 1;
            }
        }
    }
    Ok(found)
}

/// Scan `*.warc` / `*.warc.gz` files. A file with broken framing is logged
/// and scanning continues with the next file.
pub fn scan_warc_dir(dir: &Path, emit: &mut dyn FnMut(FileCandidate) -> Result<()>) -> Result<usize> {
    if !dir.is_dir() {
        warn!(component = "find_files", dir = %dir.display(), "WARC directory not found");
        return Ok(0);
    }
    let mut found = 0;
    for path in sorted_files(dir, |n| n.ends_with(".warc") || n.ends_with(".warc.gz"))? {
        let warc_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let reader = match WarcReader::open(&path) {
            Ok(r) => r,
            Err(err) => {
                warn!(component = "find_files", file = %warc_file, error = %err, "skipping unreadable WARC");
                continue;
            }
        };
        for record in reader {
            let record = match record {
                Ok(r) => r,
                Err(err) => {
                    warn!(component = "find_files", file = %warc_file, error = %err, "WARC scan stopped early");
                    break;
                }
            };
            if record.warc_type() != Some("response") {
                continue;
            }
            let Some(content_type) = record.http_header("Content-Type") else {
                continue;
            };
            if content_type.is_empty() || content_type.starts_with("text/") {
                continue;
            }
            let body = http_body(record.payload());
            emit(FileCandidate::Warc {
                warc_file: warc_file.clone(),
                uri: record.target_uri().unwrap_or_default().to_string(),
                content_type,
                content_disposition: record.http_header("Content-Disposition").unwrap_or_default(),
                size: body.len(),
                sha256: hex::encode(Sha256::digest(body)),
            })?;
            found += 1;
        }
        debug!(component = "find_files", file = %warc_file, "WARC scanned");
    }
    Ok(found)
}

/// Body of an HTTP response payload (after the header block).
fn http_body(payload: &[u8]) -> &[u8] {
    let split = |sep: &[u8]| {
        payload
            .windows(sep.len())
            .position(|w| w == sep)
            .map(|at| &payload[at + sep.len()..])
    };
    split(b"\r\n\r\n").or_else(|| split(b"\n\n")).unwrap_or(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listed_attachments_prefer_filename_then_url() {
        let obj = json!({
            "id": 7,
            "attachments": [{"filename": "plan.pdf", "url": "http://x/plan.pdf"}, "raw.zip"],
            "files": [{"url": "http://x/a.png"}],
        });
        let found = scan_message(&obj);
        assert_eq!(found.len(), 3);
        assert_eq!(
            found[0],
            FileCandidate::Listed {
                message: "7".into(),
                meta_key: "attachments".into(),
                file: json!("plan.pdf"),
                raw: json!({"filename": "plan.pdf", "url": "http://x/plan.pdf"}),
            }
        );
        assert!(matches!(&found[1], FileCandidate::Listed { file, .. } if file == &json!("raw.zip")));
        assert!(matches!(&found[2], FileCandidate::Listed { file, meta_key, .. } if file == &json!("http://x/a.png") && meta_key == "files"));
    }

    #[test]
    fn body_urls_are_filtered_and_deduplicated() {
        let obj = json!({
            "id": "9",
            "full_text": "see http://host/file.zip and http://host/page.html and http://host/file.zip",
            "index_text": "http://groups.yahoo.com/group/x/files/",
        });
        let urls: Vec<String> = scan_message(&obj)
            .into_iter()
            .filter_map(|c| match c {
                FileCandidate::BodyUrl { candidate_url, .. } => Some(candidate_url),
                _ => None,
            })
            .collect();
        assert_eq!(urls, ["http://groups.yahoo.com/group/x/files/", "http://host/file.zip"]);
    }

    #[test]
    fn candidates_serialize_with_source_tag() {
        let c = FileCandidate::BodyUrl {
            message: "1".into(),
            candidate_url: "http://h/a.pdf".into(),
        };
        let v: Value = serde_json::to_value(&c).unwrap();
        assert_eq!(v, json!({"source": "body_url", "message": "1", "candidate_url": "http://h/a.pdf"}));
    }

    #[test]
    fn file_url_heuristics() {
        assert!(looks_like_file_url("http://h/x.PDF"));
        assert!(looks_like_file_url("http://h/x.tar?dl=1"));
        assert!(looks_like_file_url("http://h/attachments/12"));
        assert!(!looks_like_file_url("http://h/index.html"));
    }

    #[test]
    fn http_body_skips_headers() {
        assert_eq!(http_body(b"HTTP/1.1 200 OK\r\nA: b\r\n\r\nBODY"), b"BODY");
        assert_eq!(http_body(b"HTTP/1.1 200 OK\nA: b\n\nBODY"), b"BODY");
        assert_eq!(http_body(b"no headers"), b"no headers");
    }
}
