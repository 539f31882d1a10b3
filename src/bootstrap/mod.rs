//! Navigation/search bootstrap.
//!
//! Runs once per page load and makes the page self-sufficient for
//! navigation: it locates the shared fragment by trying `./nav.html`,
//! `../nav.html` and `../../nav.html` in order, rewrites the fragment for the
//! page's root prefix, injects it at the top of `<body>`, makes sure the site
//! stylesheet is linked, and restores the search query from the URL.
//! Submission of the search form is handled by [`Bootstrap::submit`].
//!
//! The browser realisation of the same component is `site.js`
//! ([`crate::site::scripts`]); this module is the reference used by
//! `groupsite verify` and the tests.
//!
//! Every failure is swallowed. A page whose fragment cannot be found simply
//! renders without navigation.

pub mod host;
pub mod rewrite;
pub mod static_host;

use tracing::{debug, trace};
use url::Url;

pub use host::{HostError, PageHost};
pub use rewrite::{RewrittenFragment, RootLink, rewrite_fragment};
pub use static_host::{DispatchedEvent, StaticSiteHost};

use crate::site::nav::{NAV_FILE, QUERY_KEY};
use crate::site::paths::{HOME_PAGE, RootPrefix, is_home_path};
use crate::site::styles::{STYLESHEET_FILE, STYLESHEET_MARKER};

/// Page-local event carrying the submitted query.
pub const SEARCH_EVENT: &str = "site-search";

/// Fragment locations relative to the page, nearest first.
pub fn nav_candidates() -> [String; 3] {
    [
        format!("./{NAV_FILE}"),
        format!("../{NAV_FILE}"),
        format!("../../{NAV_FILE}"),
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct BootstrapOptions {
    pub inject_stylesheet: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            inject_stylesheet: true,
        }
    }
}

/// One fragment fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub url: Url,
    pub error: Option<HostError>,
}

/// What a bootstrap run did.
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub root: RootPrefix,
    /// True when the root prefix came from the page's `site-root` meta.
    pub root_declared: bool,
    pub is_home: bool,
    pub attempts: Vec<FetchAttempt>,
    /// The candidate that answered, if any.
    pub fragment_url: Option<Url>,
    pub fragment: Option<RewrittenFragment>,
    pub stylesheet_injected: bool,
}

impl BootstrapOutcome {
    pub fn injected(&self) -> bool {
        self.fragment.is_some()
    }

    pub fn failed_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.error.is_some()).count()
    }

    /// Per-page state the submit handler needs.
    pub fn session(&self) -> NavSession {
        NavSession {
            root: self.root,
            is_home: self.is_home,
        }
    }
}

/// Root prefix and page kind, fixed for the page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavSession {
    pub root: RootPrefix,
    pub is_home: bool,
}

/// Result of a search form submission. The default submission is always
/// suppressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Home page: event dispatched and handlers invoked in place.
    InPage {
        query: String,
        handler_failures: usize,
        url_updated: bool,
    },
    /// Any other page: full navigation to the home page.
    Navigated(Url),
}

type SearchHandler = Box<dyn FnMut(&str) -> Result<(), HostError>>;

/// Search implementations registered by the home page.
///
/// Invoked after the `site-search` event, each independently: a failing
/// handler does not stop the others.
#[derive(Default)]
pub struct SearchHandlers {
    handlers: Vec<SearchHandler>,
}

impl SearchHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, handler: F)
    where
        F: FnMut(&str) -> Result<(), HostError> + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Call every handler with `query`; returns the number that failed.
    fn invoke_all(&mut self, query: &str) -> usize {
        let mut failures = 0;
        for (i, handler) in self.handlers.iter_mut().enumerate() {
            if let Err(err) = handler(query) {
                debug!(component = "bootstrap", handler = i, error = %err, "search handler failed");
                failures += 1;
            }
        }
        failures
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    options: BootstrapOptions,
}

impl Bootstrap {
    pub fn new(options: BootstrapOptions) -> Self {
        Self { options }
    }

    /// Root prefix for the current page: the declared `site-root` meta when
    /// present and well formed, otherwise the path classification.
    pub fn resolve_root<H: PageHost + ?Sized>(host: &H) -> (RootPrefix, bool) {
        if let Some(declared) = host.site_root_meta()
            && let Some(prefix) = RootPrefix::parse(&declared)
        {
            return (prefix, true);
        }
        (RootPrefix::classify_path(host.location().path()), false)
    }

    /// Whether the current page is the home/search page.
    pub fn is_home<H: PageHost + ?Sized>(host: &H, root: RootPrefix) -> bool {
        is_home_path(host.location().path(), root)
    }

    /// Link the site stylesheet unless a marked link already exists.
    /// Returns true when a link was added.
    pub fn ensure_stylesheet<H: PageHost + ?Sized>(host: &mut H, root: RootPrefix) -> bool {
        if host.has_marked_stylesheet(STYLESHEET_MARKER) {
            return false;
        }
        host.append_stylesheet(&root.join(STYLESHEET_FILE), STYLESHEET_MARKER);
        true
    }

    /// Try each candidate in order; stop at the first success.
    pub fn fetch_fragment<H: PageHost + ?Sized>(host: &mut H) -> (Option<(Url, String)>, Vec<FetchAttempt>) {
        let location = host.location();
        let mut attempts = Vec::new();
        for candidate in nav_candidates() {
            let url = match location.join(&candidate) {
                Ok(url) => url,
                Err(err) => {
                    trace!(component = "bootstrap", candidate = %candidate, error = %err, "unresolvable candidate");
                    continue;
                }
            };
            match host.fetch_text(&url) {
                Ok(body) => {
                    attempts.push(FetchAttempt { url: url.clone(), error: None });
                    return (Some((url, body)), attempts);
                }
                Err(err) => {
                    trace!(component = "bootstrap", url = %url, error = %err, "fragment candidate failed");
                    attempts.push(FetchAttempt { url, error: Some(err) });
                }
            }
        }
        (None, attempts)
    }

    /// Query-string value of `q`, if present.
    pub fn current_query<H: PageHost + ?Sized>(host: &H) -> Option<String> {
        host.location()
            .query_pairs()
            .find(|(k, _)| k == QUERY_KEY)
            .map(|(_, v)| v.into_owned())
    }

    /// Run the page-load sequence.
    pub fn run<H: PageHost + ?Sized>(&self, host: &mut H) -> BootstrapOutcome {
        let (root, root_declared) = Self::resolve_root(host);
        let is_home = Self::is_home(host, root);

        let stylesheet_injected = self.options.inject_stylesheet && Self::ensure_stylesheet(host, root);

        let (fetched, attempts) = Self::fetch_fragment(host);
        let mut outcome = BootstrapOutcome {
            root,
            root_declared,
            is_home,
            attempts,
            fragment_url: None,
            fragment: None,
            stylesheet_injected,
        };
        let Some((url, body)) = fetched else {
            debug!(
                component = "bootstrap",
                location = %host.location(),
                attempts = outcome.attempts.len(),
                "no navigation fragment reachable"
            );
            return outcome;
        };

        let query = Self::current_query(host);
        match rewrite_fragment(&body, root, query.as_deref()) {
            Ok(fragment) => {
                host.prepend_to_body(&fragment.html);
                debug!(
                    component = "bootstrap",
                    fragment = %url,
                    root = %root,
                    links = fragment.root_links.len(),
                    "navigation injected"
                );
                outcome.fragment_url = Some(url);
                outcome.fragment = Some(fragment);
            }
            Err(err) => {
                debug!(component = "bootstrap", fragment = %url, error = %err, "fragment not rewritable");
            }
        }
        outcome
    }

    /// Handle a search form submission with the input's current `query`.
    pub fn submit<H: PageHost + ?Sized>(
        &self,
        host: &mut H,
        session: NavSession,
        query: &str,
        handlers: &mut SearchHandlers,
    ) -> SubmitOutcome {
        let query = query.trim();
        if session.is_home {
            host.dispatch_event(SEARCH_EVENT, query);
            let handler_failures = handlers.invoke_all(query);
            let mut url_updated = false;
            if !query.is_empty() {
                let url = with_query(&host.location(), query);
                match host.replace_url(&url) {
                    Ok(()) => url_updated = true,
                    Err(err) => debug!(component = "bootstrap", error = %err, "url update skipped"),
                }
            }
            return SubmitOutcome::InPage {
                query: query.to_string(),
                handler_failures,
                url_updated,
            };
        }

        let location = host.location();
        let home = location
            .join(&session.root.join(HOME_PAGE))
            .unwrap_or_else(|_| location.clone());
        let target = with_query(&home, query);
        host.navigate(&target);
        SubmitOutcome::Navigated(target)
    }
}

/// `url` with `q` set to `query`, other parameters kept in order.
pub fn with_query(url: &Url, query: &str) -> Url {
    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != QUERY_KEY)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut out = url.clone();
    out.set_fragment(None);
    {
        let mut pairs = out.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(others);
        pairs.append_pair(QUERY_KEY, query);
    }
    out
}
