//! Client-side search corpus (`docs.json`).
//!
//! The home page's search script loads this file and matches queries against
//! it in the browser; the tantivy index serves the `search` command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::model::types::{DocSummary, MessageRecord};

pub const DOCS_FILE: &str = "docs.json";

pub fn doc_summaries(records: &[MessageRecord]) -> Vec<DocSummary> {
    records.iter().map(DocSummary::from).collect()
}

/// Write `docs.json` into the site directory.
pub fn write_docs_json(site_dir: &Path, records: &[MessageRecord]) -> Result<()> {
    std::fs::create_dir_all(site_dir)
        .with_context(|| format!("creating {}", site_dir.display()))?;
    let path = site_dir.join(DOCS_FILE);
    let json = serde_json::to_string(&doc_summaries(records)).context("encoding docs.json")?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), docs = records.len(), "wrote client search corpus");
    Ok(())
}
