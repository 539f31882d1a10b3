//! Normalized entity structs.

use serde::{Deserialize, Serialize};

/// One discussion message, as written to `messages.ndjson`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub author: String,
    /// RFC 3339 UTC timestamp (`2003-05-01T12:00:00Z`).
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Leading slice of `full_text`, used for indexing.
    #[serde(default)]
    pub index_text: String,
    #[serde(default)]
    pub full_text: String,
}

impl MessageRecord {
    /// Subject for display: the stored subject, else the first body line, else "No subject".
    pub fn display_subject(&self) -> String {
        let subject = self.subject.trim();
        if !subject.is_empty() {
            return subject.to_string();
        }
        self.full_text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|l| l.chars().take(120).collect())
            .unwrap_or_else(|| "No subject".to_string())
    }

    /// Author for display, falling back to "Unknown".
    pub fn display_author(&self) -> &str {
        let author = self.author.trim();
        if author.is_empty() { "Unknown" } else { author }
    }

    /// Year bucket used by the browse pages.
    pub fn year_label(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Lightweight per-message entry written to `docs.json` for the client search script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSummary {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub timestamp: Option<String>,
    pub year: Option<i32>,
    pub thread_id: String,
    pub snippet: String,
}

impl From<&MessageRecord> for DocSummary {
    fn from(rec: &MessageRecord) -> Self {
        Self {
            id: rec.id.clone(),
            subject: rec.subject.clone(),
            author: rec.author.clone(),
            timestamp: rec.timestamp.clone(),
            year: rec.year,
            thread_id: rec.thread_id.clone(),
            snippet: rec.index_text.clone(),
        }
    }
}

/// Per-message JSON emitted next to each message page (`msg/<id>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub timestamp: Option<String>,
    pub full_text: String,
}

impl From<&MessageRecord> for MessageBody {
    fn from(rec: &MessageRecord) -> Self {
        Self {
            id: rec.id.clone(),
            subject: rec.subject.clone(),
            author: rec.author.clone(),
            timestamp: rec.timestamp.clone(),
            full_text: rec.full_text.clone(),
        }
    }
}
