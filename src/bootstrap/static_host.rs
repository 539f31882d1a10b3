//! A [`PageHost`] over a generated site on disk.
//!
//! URLs under `base` map to files under the site root; the document is kept
//! as a string and mutated with lol_html. Dispatched events, history updates
//! and navigations are recorded instead of performed.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use tracing::trace;
use url::Url;

use super::host::{HostError, PageHost};
use crate::archive::html_text::html_escape;
use crate::site::paths::HOME_PAGE;
use crate::site::renderer::SITE_ROOT_META;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub name: String,
    pub detail: String,
}

pub struct StaticSiteHost {
    site_root: PathBuf,
    base: Url,
    location: Url,
    document: String,
    fetches: Vec<Url>,
    events: Vec<DispatchedEvent>,
    history: Vec<Url>,
    navigations: Vec<Url>,
}

impl StaticSiteHost {
    /// Load the page at `location`, which must lie under `base`.
    pub fn open(site_root: &Path, base: &Url, location: Url) -> Result<Self> {
        let path = resolve(site_root, base, &location)
            .with_context(|| format!("{location} is outside {base}"))?;
        let document = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::from_document(site_root, base, location, document))
    }

    pub fn from_document(site_root: &Path, base: &Url, location: Url, document: String) -> Self {
        Self {
            site_root: site_root.to_path_buf(),
            base: base.clone(),
            location,
            document,
            fetches: Vec::new(),
            events: Vec::new(),
            history: Vec::new(),
            navigations: Vec::new(),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Every URL passed to `fetch_text`, in order.
    pub fn fetches(&self) -> &[Url] {
        &self.fetches
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    pub fn history(&self) -> &[Url] {
        &self.history
    }

    pub fn navigations(&self) -> &[Url] {
        &self.navigations
    }

    /// `value` attribute of `<input id=..>` in the current document.
    pub fn input_value(&self, id: &str) -> Option<String> {
        let found = Rc::new(RefCell::new(None));
        let result = rewrite_str(
            &self.document,
            RewriteStrSettings {
                element_content_handlers: vec![element!(format!("input[id=\"{id}\"]"), {
                    let found = Rc::clone(&found);
                    move |el| {
                        let mut found = found.borrow_mut();
                        if found.is_none() {
                            *found = el.get_attribute("value");
                        }
                        Ok(())
                    }
                })],
                ..RewriteStrSettings::default()
            },
        );
        if let Err(err) = result {
            trace!(error = %err, "document scan failed");
        }
        found.take()
    }

    /// Number of elements matching `selector` in the current document.
    pub fn count(&self, selector: &str) -> usize {
        let count = Rc::new(RefCell::new(0usize));
        let result = rewrite_str(
            &self.document,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, {
                    let count = Rc::clone(&count);
                    move |_el| {
                        *count.borrow_mut() += 1;
                        Ok(())
                    }
                })],
                ..RewriteStrSettings::default()
            },
        );
        if let Err(err) = result {
            trace!(error = %err, "document scan failed");
        }
        count.take()
    }

    fn mutate(&mut self, selector: &str, markup: String, prepend: bool) {
        let result = rewrite_str(
            &self.document,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, move |el| {
                    if prepend {
                        el.prepend(&markup, ContentType::Html);
                    } else {
                        el.append(&markup, ContentType::Html);
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        );
        match result {
            Ok(doc) => self.document = doc,
            Err(err) => trace!(selector, error = %err, "document mutation skipped"),
        }
    }
}

/// File backing `url`, if it lies under `base`. Directory URLs map to
/// their `index.html`.
pub fn resolve(site_root: &Path, base: &Url, url: &Url) -> Option<PathBuf> {
    if url.origin() != base.origin() {
        return None;
    }
    let rel = url.path().strip_prefix(base.path())?;
    let rel = urlencoding::decode(rel).ok()?;
    let mut path = site_root.to_path_buf();
    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }
    if rel.is_empty() || rel.ends_with('/') {
        path.push(HOME_PAGE);
    }
    Some(path)
}

impl PageHost for StaticSiteHost {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn site_root_meta(&self) -> Option<String> {
        let found = Rc::new(RefCell::new(None));
        let result = rewrite_str(
            &self.document,
            RewriteStrSettings {
                element_content_handlers: vec![element!(format!("meta[name=\"{SITE_ROOT_META}\"]"), {
                    let found = Rc::clone(&found);
                    move |el| {
                        let mut found = found.borrow_mut();
                        if found.is_none() {
                            *found = el.get_attribute("content");
                        }
                        Ok(())
                    }
                })],
                ..RewriteStrSettings::default()
            },
        );
        if let Err(err) = result {
            trace!(error = %err, "document scan failed");
        }
        found.take()
    }

    fn fetch_text(&mut self, url: &Url) -> Result<String, HostError> {
        self.fetches.push(url.clone());
        let path = resolve(&self.site_root, &self.base, url).ok_or_else(|| HostError::Network {
            url: url.to_string(),
            reason: "outside the site".to_string(),
        })?;
        std::fs::read_to_string(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => HostError::Status {
                url: url.to_string(),
                status: 404,
            },
            _ => HostError::Network {
                url: url.to_string(),
                reason: err.to_string(),
            },
        })
    }

    fn has_marked_stylesheet(&self, marker: &str) -> bool {
        self.count(&format!("head link[{marker}]")) > 0
    }

    fn append_stylesheet(&mut self, href: &str, marker: &str) {
        let link = format!(r#"<link rel="stylesheet" href="{}" {marker}>"#, html_escape(href));
        self.mutate("head", link, false);
    }

    fn prepend_to_body(&mut self, html: &str) {
        self.mutate("body", html.to_string(), true);
    }

    fn dispatch_event(&mut self, name: &str, detail: &str) {
        self.events.push(DispatchedEvent {
            name: name.to_string(),
            detail: detail.to_string(),
        });
    }

    fn replace_url(&mut self, url: &Url) -> Result<(), HostError> {
        if url.origin() != self.location.origin() {
            return Err(HostError::History(format!("cross-origin url {url}")));
        }
        self.location = url.clone();
        self.history.push(url.clone());
        Ok(())
    }

    fn navigate(&mut self, url: &Url) {
        self.navigations.push(url.clone());
    }
}
