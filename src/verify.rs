//! `groupsite verify`: replay the bootstrap over every generated page.
//!
//! Each page is loaded into a [`StaticSiteHost`] at its URL under the
//! configured base URL and bootstrapped. A page passes when the fragment is
//! found, the declared root prefix matches the page's depth, and every
//! rewritten link, the form action and the stylesheet resolve to files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

use crate::bootstrap::static_host::resolve;
use crate::bootstrap::{Bootstrap, BootstrapOptions, PageHost, StaticSiteHost};
use crate::site::nav::NAV_FILE;
use crate::site::paths::RootPrefix;
use crate::site::styles::{STYLESHEET_FILE, STYLESHEET_MARKER};

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub page: String,
    pub root: String,
    pub fragment: Option<String>,
    pub failed_attempts: usize,
    pub links: usize,
    pub problems: Vec<String>,
}

impl PageReport {
    pub fn ok(&self) -> bool {
        self.problems.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub site: PathBuf,
    pub base_url: String,
    pub pages: usize,
    pub failed: usize,
    pub results: Vec<PageReport>,
}

impl VerifyReport {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

/// Site-relative paths of every HTML page, sorted; the fragment is excluded.
pub fn site_pages(site_dir: &Path) -> Vec<String> {
    let mut pages: Vec<String> = WalkDir::new(site_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(site_dir).ok()?;
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("/"))
        })
        .filter(|rel| rel != NAV_FILE)
        .collect();
    pages.sort();
    pages
}

fn base_url(base: &str) -> Result<Url> {
    let mut base = Url::parse(base).with_context(|| format!("invalid base url {base}"))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

pub fn verify_page(site_dir: &Path, base: &Url, rel: &str, options: BootstrapOptions) -> Result<PageReport> {
    let encoded: Vec<String> = rel.split('/').map(|s| urlencoding::encode(s).into_owned()).collect();
    let location = base
        .join(&encoded.join("/"))
        .with_context(|| format!("page url for {rel}"))?;
    let mut host = StaticSiteHost::open(site_dir, base, location.clone())?;
    let outcome = Bootstrap::new(options).run(&mut host);

    let mut problems = Vec::new();
    let expected = RootPrefix::for_page(rel);
    if !outcome.root_declared {
        problems.push("page does not declare its site root".to_string());
    }
    if outcome.root != expected {
        problems.push(format!("root prefix {} but page depth needs {expected}", outcome.root));
    }

    let check = |what: &str, href: &str| -> Option<String> {
        match location.join(href) {
            Ok(url) if resolve(site_dir, base, &url).is_some_and(|p| p.is_file()) => None,
            Ok(url) => Some(format!("{what} {href} -> {url} does not exist")),
            Err(err) => Some(format!("{what} {href} is not a valid url: {err}")),
        }
    };

    match &outcome.fragment {
        Some(fragment) => {
            problems.extend(fragment.root_links.iter().filter_map(|l| check("link", &l.href)));
            match &fragment.form_action {
                Some(action) => problems.extend(check("form action", action)),
                None => problems.push("fragment has no search form".to_string()),
            }
        }
        None => problems.push(format!(
            "navigation fragment not reachable after {} attempts",
            outcome.attempts.len()
        )),
    }
    if options.inject_stylesheet {
        if host.has_marked_stylesheet(STYLESHEET_MARKER) {
            problems.extend(check("stylesheet", &outcome.root.join(STYLESHEET_FILE)));
        } else {
            problems.push("stylesheet link missing".to_string());
        }
    }

    debug!(component = "verify", page = rel, problems = problems.len(), "page checked");
    Ok(PageReport {
        page: rel.to_string(),
        root: outcome.root.to_string(),
        fragment: outcome.fragment_url.as_ref().map(|u| u.to_string()),
        failed_attempts: outcome.failed_attempts(),
        links: outcome.fragment.as_ref().map_or(0, |f| f.root_links.len()),
        problems,
    })
}

pub fn verify_site(site_dir: &Path, base: &str, options: BootstrapOptions) -> Result<VerifyReport> {
    let base = base_url(base)?;
    let pages = site_pages(site_dir);
    if pages.is_empty() {
        anyhow::bail!("no pages under {} (run `groupsite pages` first?)", site_dir.display());
    }
    let results: Vec<PageReport> = pages
        .par_iter()
        .map(|rel| verify_page(site_dir, &base, rel, options))
        .collect::<Result<_>>()?;
    let failed = results.iter().filter(|r| !r.ok()).count();
    info!(
        component = "verify",
        pages = results.len(),
        failed,
        site = %site_dir.display(),
        "site verified"
    );
    Ok(VerifyReport {
        site: site_dir.to_path_buf(),
        base_url: base.to_string(),
        pages: results.len(),
        failed,
        results,
    })
}
