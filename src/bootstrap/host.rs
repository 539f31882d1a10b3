//! The page environment the bootstrap runs against.

use thiserror::Error;
use url::Url;

/// Failures reported by a [`PageHost`]. The bootstrap never propagates
/// these; they decide which fallback to take and are logged at `debug`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("history update rejected: {0}")]
    History(String),

    #[error("search handler failed: {0}")]
    Handler(String),
}

/// Location, document and browser services for one page load.
///
/// A host is scoped to a single page load; nothing carries over between
/// loads.
pub trait PageHost {
    /// Current page URL.
    fn location(&self) -> Url;

    /// Value of `<meta name="site-root">`, if the page declares one.
    fn site_root_meta(&self) -> Option<String>;

    /// Fetch a resource as text. Non-ok statuses are errors.
    fn fetch_text(&mut self, url: &Url) -> Result<String, HostError>;

    /// True when `<head>` already holds a stylesheet link with `marker`.
    fn has_marked_stylesheet(&self, marker: &str) -> bool;

    /// Append `<link rel="stylesheet" href=.. marker>` to `<head>`.
    fn append_stylesheet(&mut self, href: &str, marker: &str);

    /// Insert markup as the first child of `<body>`.
    fn prepend_to_body(&mut self, html: &str);

    /// Broadcast a page-local event carrying `detail`.
    fn dispatch_event(&mut self, name: &str, detail: &str);

    /// Replace the visible URL without reloading.
    fn replace_url(&mut self, url: &Url) -> Result<(), HostError>;

    /// Full page navigation.
    fn navigate(&mut self, url: &Url);
}
