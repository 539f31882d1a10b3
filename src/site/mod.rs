//! Static site generation.
//!
//! ```text
//! site/
//! ├── mod.rs        # SiteBuilder (this file)
//! ├── paths.rs      # Layout, root prefixes, slugs
//! ├── threads.rs    # Prev/next and in-thread neighbours
//! ├── renderer.rs   # Records -> HTML pages
//! ├── nav.rs        # Shared navigation fragment
//! ├── scripts.rs    # site.js / search.js
//! └── styles.rs     # site.css
//! ```
//!
//! Output layout under the site directory:
//!
//! ```text
//! index.html  nav.html  site.css  site.js  search.js  docs.json
//! msg/<id>.html  msg/<id>.json
//! browse/index.html  browse/<year>.html
//! browse/authors/index.html  browse/authors/<slug>.html
//! ```

pub mod nav;
pub mod paths;
pub mod renderer;
pub mod scripts;
pub mod styles;
pub mod threads;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::model::types::{MessageBody, MessageRecord};
use crate::records;
use crate::search::docs;
use renderer::{RenderedPage, SiteMeta};
use scripts::ScriptOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BuildSummary {
    pub messages: usize,
    pub years: usize,
    pub authors: usize,
    pub pages: usize,
}

pub struct SiteBuilder {
    site_dir: PathBuf,
    meta: SiteMeta,
    scripts: ScriptOptions,
    show_progress: bool,
}

impl SiteBuilder {
    pub fn new(site_dir: impl Into<PathBuf>, meta: SiteMeta) -> Self {
        Self {
            site_dir: site_dir.into(),
            meta,
            scripts: ScriptOptions::default(),
            show_progress: false,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.site_dir, SiteMeta::new(config.title.clone())).with_scripts(ScriptOptions {
            inject_stylesheet: config.inject_stylesheet,
        })
    }

    pub fn with_scripts(mut self, scripts: ScriptOptions) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    /// Write the whole site for `records` (in chronological order).
    pub fn build(&self, records: &[MessageRecord]) -> Result<BuildSummary> {
        let started = Instant::now();
        let msg_dir = self.site_dir.join(paths::MSG_DIR);
        let authors_dir = self.site_dir.join(paths::BROWSE_DIR).join(paths::AUTHORS_DIR);
        for dir in [&msg_dir, &authors_dir] {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let records = usable_records(records);
        let records = records.as_ref();

        self.write_static_assets()?;
        docs::write_docs_json(&self.site_dir, records)?;

        let written = self.write_message_pages(records)?;

        let years = renderer::group_by_year(records);
        let authors = renderer::group_by_author(records);
        let mut listing: Vec<RenderedPage> = Vec::with_capacity(years.len() + authors.len() + 3);
        for (year, recs) in &years {
            listing.push(renderer::render_year_page(&self.meta, year, recs));
        }
        for author in &authors {
            listing.push(renderer::render_author_page(&self.meta, author));
        }
        listing.push(renderer::render_authors_index(&self.meta, &authors));
        listing.push(renderer::render_browse_index(&self.meta, &years));
        listing.push(renderer::render_home_page(&self.meta, records.len()));
        for page in &listing {
            self.write_page(page)?;
        }

        let summary = BuildSummary {
            messages: written,
            years: years.len(),
            authors: authors.len(),
            pages: written + listing.len(),
        };
        info!(
            component = "site",
            operation = "build",
            messages = summary.messages,
            years = summary.years,
            authors = summary.authors,
            pages = summary.pages,
            elapsed_ms = started.elapsed().as_millis() as u64,
            site = %self.site_dir.display(),
            "site written"
        );
        Ok(summary)
    }

    fn write_static_assets(&self) -> Result<()> {
        let bundle = scripts::generate_scripts(&self.scripts);
        let assets = [
            (nav::NAV_FILE, nav::render_nav(&self.meta.title)),
            (styles::STYLESHEET_FILE, styles::generate_styles()),
            (renderer::SCRIPT_FILE, bundle.site_js),
            (renderer::SEARCH_SCRIPT_FILE, bundle.search_js),
        ];
        for (name, content) in assets {
            let path = self.site_dir.join(name);
            std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
            debug!(component = "site", asset = name, "wrote asset");
        }
        Ok(())
    }

    fn write_message_pages(&self, records: &[MessageRecord]) -> Result<usize> {
        let neighbors = threads::neighbors(records);
        let progress = if self.show_progress {
            let pb = ProgressBar::new(records.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template("│ {bar:50.cyan/blue} {pos}/{len} {msg}") {
                pb.set_style(style.progress_chars("██░"));
            }
            pb.set_message("message pages");
            pb
        } else {
            ProgressBar::hidden()
        };

        let msg_dir = self.site_dir.join(paths::MSG_DIR);
        records
            .par_iter()
            .zip(neighbors.par_iter())
            .try_for_each(|(rec, nav)| -> Result<()> {
                let page = renderer::render_message_page(&self.meta, rec, nav);
                self.write_page(&page)?;
                let json_path = msg_dir.join(format!("{}.json", rec.id));
                let body = serde_json::to_string(&MessageBody::from(rec))
                    .with_context(|| format!("encoding message {}", rec.id))?;
                std::fs::write(&json_path, body)
                    .with_context(|| format!("writing {}", json_path.display()))?;
                progress.inc(1);
                Ok(())
            })?;
        progress.finish_and_clear();
        Ok(records.len())
    }

    fn write_page(&self, page: &RenderedPage) -> Result<()> {
        let rel = urlencoding::decode(&page.path)
            .with_context(|| format!("decoding page path {}", page.path))?;
        let path = self.site_dir.join(rel.as_ref());
        std::fs::write(&path, &page.html).with_context(|| format!("writing {}", path.display()))
    }
}

/// Records whose id can name a file inside `msg/`.
fn usable_records(records: &[MessageRecord]) -> Cow<'_, [MessageRecord]> {
    if records.iter().all(|r| paths::is_safe_file_stem(&r.id)) {
        return Cow::Borrowed(records);
    }
    let kept: Vec<MessageRecord> = records
        .iter()
        .filter(|r| paths::is_safe_file_stem(&r.id))
        .cloned()
        .collect();
    warn!(
        component = "site",
        skipped = records.len() - kept.len(),
        "skipping messages whose id cannot be used as a file name"
    );
    Cow::Owned(kept)
}

/// `groupsite pages`: records -> static site.
pub fn run_pages(config: &SiteConfig, show_progress: bool) -> Result<BuildSummary> {
    let path = config.records_path();
    let records = records::read_records(&path)
        .context("loading records (run `groupsite extract` first?)")?;
    SiteBuilder::from_config(config)
        .with_progress(show_progress)
        .build(&records)
}
