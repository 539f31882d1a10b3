//! Search layer facade.
//!
//! - **[`tantivy`]**: index schema and construction from message records.
//! - **[`query`]**: query execution for the `search` command.
//! - **[`docs`]**: the `docs.json` corpus consumed by the site's search page.

pub mod docs;
pub mod query;
pub mod tantivy;

use anyhow::{Context, Result};

use crate::config::SiteConfig;
use crate::records;

/// `groupsite index`: records -> tantivy index + `docs.json`.
pub fn run_index(config: &SiteConfig) -> Result<usize> {
    let path = config.records_path();
    let records = records::read_records(&path)
        .context("loading records (run `groupsite extract` first?)")?;
    let count = self::tantivy::build_index(&config.index_base(), &records)?;
    docs::write_docs_json(&config.site_dir, &records)?;
    Ok(count)
}
