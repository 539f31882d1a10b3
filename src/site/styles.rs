//! The site stylesheet (`site.css`).

use tracing::debug;

pub const STYLESHEET_FILE: &str = "site.css";
/// Attribute marking the stylesheet link the bootstrap manages.
pub const STYLESHEET_MARKER: &str = "data-site-style";

pub fn generate_styles() -> String {
    let css = format!("{CORE_STYLES}\n{NAV_STYLES}\n{MESSAGE_STYLES}\n{SEARCH_STYLES}");
    debug!(
        component = "styles",
        operation = "generate",
        bytes = css.len(),
        "Generated site stylesheet"
    );
    css
}

const CORE_STYLES: &str = r#"
:root {
    --bg: #ffffff;
    --surface: #f6f8fa;
    --border: #e1e4e8;
    --text: #24292e;
    --muted: #586069;
    --accent: #0366d6;
}

* { box-sizing: border-box; }

body {
    margin: 0;
    padding: 0;
    background: var(--bg);
    color: var(--text);
    font-family: system-ui, -apple-system, "Segoe UI", Roboto, Arial, sans-serif;
    line-height: 1.5;
}

a { color: var(--accent); text-decoration: none; }
a:hover { text-decoration: underline; }

.page-container {
    max-width: 880px;
    margin: 2rem auto;
    padding: 0 1rem;
}
"#;

const NAV_STYLES: &str = r#"
#site-nav {
    width: 100%;
    display: flex;
    flex-wrap: wrap;
    align-items: center;
    gap: 1rem;
    padding: .75rem 1rem;
    background: var(--surface);
    border-bottom: 1px solid var(--border);
}

#site-nav .site-title { font-weight: 600; color: var(--text); margin-right: auto; }

#site-search { display: flex; gap: .5rem; }
#site-search input { padding: .3rem .5rem; border: 1px solid var(--border); border-radius: 4px; min-width: 14rem; }
#site-search button { padding: .3rem .75rem; border: 1px solid var(--border); border-radius: 4px; background: var(--bg); cursor: pointer; }
"#;

const MESSAGE_STYLES: &str = r#"
header h1 { font-size: 1.25rem; margin: 0 0 .25rem 0; }
.msg-meta { color: var(--muted); margin: .25rem 0 1rem 0; }
.msg-nav { margin: 0 0 1rem 0; color: var(--muted); font-size: .95rem; }
.msg-nav a { margin-right: .5rem; }
.msg-body { padding: 1rem; border: 1px solid var(--border); border-radius: 6px; overflow-wrap: anywhere; }
.msg-text { white-space: pre-wrap; margin: 0; font-family: inherit; }
.msg-list li, .year-list li, .author-list li { margin: .2rem 0; }
"#;

const SEARCH_STYLES: &str = r#"
.search-status { color: var(--muted); }
.search-results { padding-left: 1.25rem; }
.search-results li { margin: .75rem 0; }
.result-meta { color: var(--muted); font-size: .9rem; }
.result-snippet { margin: .25rem 0 0 0; color: var(--muted); font-size: .9rem; }
"#;
