//! Navigation bootstrap replayed against a generated site.

mod util;

use std::path::Path;

use groupsite::bootstrap::{
    Bootstrap, BootstrapOptions, DispatchedEvent, HostError, PageHost, SEARCH_EVENT, SearchHandlers,
    StaticSiteHost, SubmitOutcome,
};
use groupsite::model::types::MessageRecord;
use groupsite::site::SiteBuilder;
use groupsite::site::nav::{NAV_FILE, SEARCH_INPUT_ID};
use groupsite::site::paths::RootPrefix;
use groupsite::site::renderer::SiteMeta;
use tempfile::TempDir;
use url::Url;

const BASE: &str = "http://archive.test/g/";

fn record(id: &str, thread: &str, author: &str, ts: &str, year: i32) -> MessageRecord {
    MessageRecord {
        id: id.into(),
        thread_id: thread.into(),
        subject: format!("Subject {id}"),
        author: author.into(),
        timestamp: Some(ts.into()),
        year: Some(year),
        index_text: format!("body of {id}"),
        full_text: format!("body of {id}"),
    }
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let records = [
        record("1", "1", "Frank", "2003-01-01T00:00:00Z", 2003),
        record("2", "1", "Ada", "2003-01-02T00:00:00Z", 2003),
        record("3", "3", "Frank", "2004-01-01T00:00:00Z", 2004),
    ];
    SiteBuilder::new(dir.path(), SiteMeta::new("Fixture Group"))
        .build(&records)
        .unwrap();
    dir
}

fn base() -> Url {
    Url::parse(BASE).unwrap()
}

fn open(site: &Path, page: &str) -> StaticSiteHost {
    StaticSiteHost::open(site, &base(), base().join(page).unwrap()).unwrap()
}

#[test]
fn root_prefix_follows_page_depth() {
    let dir = site();
    for (page, expected) in [
        ("index.html", "./"),
        ("msg/1.html", "../"),
        ("browse/index.html", "../"),
        ("browse/2003.html", "../"),
        ("browse/authors/index.html", "../../"),
        ("browse/authors/frank.html", "../../"),
    ] {
        let mut host = open(dir.path(), page);
        let outcome = Bootstrap::default().run(&mut host);
        assert!(outcome.root_declared, "{page} should declare its root");
        assert_eq!(outcome.root.as_str(), expected, "{page}");
        assert_eq!(outcome.root, RootPrefix::for_page(page));
    }
}

#[test]
fn fragment_one_level_up_is_found_on_second_attempt() {
    let dir = site();
    let mut host = open(dir.path(), "msg/2.html");
    let outcome = Bootstrap::default().run(&mut host);

    assert!(outcome.injected());
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.failed_attempts(), 1);
    assert_eq!(outcome.fragment_url.as_ref().unwrap().as_str(), "http://archive.test/g/nav.html");
    assert_eq!(
        host.fetches().iter().map(Url::as_str).collect::<Vec<_>>(),
        ["http://archive.test/g/msg/nav.html", "http://archive.test/g/nav.html"]
    );

    let fragment = outcome.fragment.unwrap();
    assert!(fragment.root_links.iter().all(|l| l.href.starts_with("../")));
    assert_eq!(fragment.form_action.as_deref(), Some("../index.html"));
    assert!(host.document().contains(r#"<nav id="site-nav""#));
    assert!(host.document().contains(r#"href="../browse/authors/index.html""#));
}

#[test]
fn fragment_two_levels_up_is_found_on_third_attempt() {
    let dir = site();
    let mut host = open(dir.path(), "browse/authors/ada.html");
    let outcome = Bootstrap::default().run(&mut host);

    assert!(outcome.injected());
    assert_eq!(outcome.failed_attempts(), 2);
    assert_eq!(outcome.root.as_str(), "../../");
    let fragment = outcome.fragment.unwrap();
    assert!(fragment.root_links.iter().any(|l| l.href == "../../browse/index.html"));
}

#[test]
fn home_page_uses_first_candidate() {
    let dir = site();
    let mut host = open(dir.path(), "");
    let outcome = Bootstrap::default().run(&mut host);
    assert!(outcome.is_home);
    assert_eq!(outcome.failed_attempts(), 0);
    assert_eq!(outcome.fragment.unwrap().form_action.as_deref(), Some("./index.html"));
}

#[test]
fn missing_fragment_leaves_page_untouched() {
    let dir = site();
    std::fs::remove_file(dir.path().join(NAV_FILE)).unwrap();
    let mut host = open(dir.path(), "msg/1.html");
    let outcome = Bootstrap::default().run(&mut host);

    assert!(!outcome.injected());
    assert_eq!(outcome.attempts.len(), 3);
    assert_eq!(outcome.failed_attempts(), 3);
    assert!(outcome.fragment_url.is_none());
    assert!(!host.document().contains("site-nav"));
}

#[test]
fn query_in_url_prefills_search_input() {
    let dir = site();
    let mut host = open(dir.path(), "browse/2003.html?q=frank");
    let outcome = Bootstrap::default().run(&mut host);
    assert_eq!(outcome.fragment.unwrap().query_input, Some(SEARCH_INPUT_ID));
    assert_eq!(host.input_value(SEARCH_INPUT_ID).as_deref(), Some("frank"));
}

#[test]
fn home_submit_searches_in_place() {
    let dir = site();
    let mut host = open(dir.path(), "index.html");
    let session = Bootstrap::default().run(&mut host).session();
    assert!(session.is_home);

    let mut handlers = SearchHandlers::new();
    let outcome = Bootstrap::default().submit(&mut host, session, "  box ", &mut handlers);

    assert_eq!(
        outcome,
        SubmitOutcome::InPage {
            query: "box".into(),
            handler_failures: 0,
            url_updated: true,
        }
    );
    assert_eq!(
        host.events(),
        [DispatchedEvent {
            name: SEARCH_EVENT.into(),
            detail: "box".into(),
        }]
    );
    assert!(host.navigations().is_empty());
    assert_eq!(host.location().as_str(), "http://archive.test/g/index.html?q=box");
}

#[test]
fn other_pages_submit_by_navigating_home() {
    let dir = site();
    let mut host = open(dir.path(), "msg/3.html");
    let session = Bootstrap::default().run(&mut host).session();
    assert!(!session.is_home);

    let outcome = Bootstrap::default().submit(&mut host, session, "sumption", &mut SearchHandlers::new());
    let expected = Url::parse("http://archive.test/g/index.html?q=sumption").unwrap();
    assert_eq!(outcome, SubmitOutcome::Navigated(expected.clone()));
    assert_eq!(host.navigations(), [expected]);
    assert!(host.events().is_empty());
}

#[test]
fn deep_pages_navigate_to_the_same_home() {
    let dir = site();
    let mut host = open(dir.path(), "browse/authors/frank.html");
    let session = Bootstrap::default().run(&mut host).session();
    let outcome = Bootstrap::default().submit(&mut host, session, "a b", &mut SearchHandlers::new());
    assert_eq!(
        outcome,
        SubmitOutcome::Navigated(Url::parse("http://archive.test/g/index.html?q=a+b").unwrap())
    );
}

#[test]
fn stylesheet_is_linked_once() {
    let dir = site();
    let mut host = open(dir.path(), "msg/1.html");
    let first = Bootstrap::default().run(&mut host);
    let second = Bootstrap::default().run(&mut host);

    assert!(first.stylesheet_injected);
    assert!(!second.stylesheet_injected);
    assert_eq!(host.count("head link[data-site-style]"), 1);
    assert!(host.document().contains(r#"href="../site.css""#));
}

#[test]
fn stylesheet_injection_can_be_disabled() {
    let dir = site();
    let mut host = open(dir.path(), "msg/1.html");
    let outcome = Bootstrap::new(BootstrapOptions {
        inject_stylesheet: false,
    })
    .run(&mut host);
    assert!(!outcome.stylesheet_injected);
    assert_eq!(host.count("head link[data-site-style]"), 0);
}

/// Host whose network and history always fail.
struct OfflineHost(StaticSiteHost);

impl PageHost for OfflineHost {
    fn location(&self) -> Url {
        self.0.location()
    }

    fn site_root_meta(&self) -> Option<String> {
        self.0.site_root_meta()
    }

    fn fetch_text(&mut self, url: &Url) -> Result<String, HostError> {
        Err(HostError::Network {
            url: url.to_string(),
            reason: "offline".into(),
        })
    }

    fn has_marked_stylesheet(&self, marker: &str) -> bool {
        self.0.has_marked_stylesheet(marker)
    }

    fn append_stylesheet(&mut self, href: &str, marker: &str) {
        self.0.append_stylesheet(href, marker);
    }

    fn prepend_to_body(&mut self, html: &str) {
        self.0.prepend_to_body(html);
    }

    fn dispatch_event(&mut self, name: &str, detail: &str) {
        self.0.dispatch_event(name, detail);
    }

    fn replace_url(&mut self, _url: &Url) -> Result<(), HostError> {
        Err(HostError::History("denied".into()))
    }

    fn navigate(&mut self, url: &Url) {
        self.0.navigate(url);
    }
}

#[test]
fn host_failures_are_swallowed() {
    let dir = site();
    let tracing = util::TestTracing::new();
    let _guard = tracing.install();

    let mut host = OfflineHost(open(dir.path(), "index.html"));
    let outcome = Bootstrap::default().run(&mut host);
    assert!(!outcome.injected());
    assert_eq!(outcome.failed_attempts(), 3);
    assert!(outcome.stylesheet_injected);

    let mut handlers = SearchHandlers::new();
    handlers.register(|_| Err(HostError::Handler("broken index".into())));
    handlers.register(|_| Ok(()));
    let submitted = Bootstrap::default().submit(&mut host, outcome.session(), "box", &mut handlers);
    assert_eq!(
        submitted,
        SubmitOutcome::InPage {
            query: "box".into(),
            handler_failures: 1,
            url_updated: false,
        }
    );
    assert_eq!(host.0.events().len(), 1);
    tracing.assert_contains("url update skipped");
}

#[test]
fn undeclared_root_falls_back_to_path_classification() {
    let dir = site();
    let doc = "<html><head></head><body><p>legacy</p></body></html>".to_string();
    let location = base().join("msg/9.html").unwrap();
    let mut host = StaticSiteHost::from_document(dir.path(), &base(), location, doc);
    let outcome = Bootstrap::default().run(&mut host);
    assert!(!outcome.root_declared);
    assert_eq!(outcome.root, RootPrefix::ONE_UP);
    assert!(outcome.injected());
}
