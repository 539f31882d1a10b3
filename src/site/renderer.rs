//! Records to HTML pages.
//!
//! Every page is a complete document that carries its own root prefix in
//! `<meta name="site-root">` and loads the bootstrap script through it. The
//! navigation itself is not rendered here: the bootstrap injects `nav.html`.
//!
//! All archive text is HTML-escaped. Bodies that are already HTML pass
//! through [`sanitize_html`] instead.

use std::collections::{BTreeMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::paths::{self, BROWSE_DIR, HOME_PAGE, RootPrefix};
use super::threads::Neighbors;
use crate::archive::email::{bytes_to_text, decode_base64_lenient};
use crate::archive::html_text::{html_escape, looks_like_html, unescape_entities};
use crate::model::types::MessageRecord;

pub const SITE_ROOT_META: &str = "site-root";
pub const SCRIPT_FILE: &str = "site.js";
pub const SEARCH_SCRIPT_FILE: &str = "search.js";

static B64_CTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Content-Transfer-Encoding:\s*base64").expect("cte regex"));
static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n\r?\n").expect("blank line regex"));
static BOUNDARY_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n--[^\r\n]+").expect("boundary regex"));
static CONTENT_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Content-Type:\s*([^\r\n;]+)").expect("content type regex"));
static BASE64_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=]{16,}$").expect("base64 regex"));

/// Site-wide values every page needs.
#[derive(Debug, Clone)]
pub struct SiteMeta {
    pub title: String,
}

impl SiteMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

/// A rendered page and where it goes, relative to the site root.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub path: String,
    pub html: String,
}

impl RenderedPage {
    fn new(path: String, html: String) -> Self {
        Self { path, html }
    }
}

fn page_shell(site: &SiteMeta, rel_path: &str, page_title: &str, main: &str, extra_scripts: &[&str]) -> String {
    let prefix = RootPrefix::for_page(rel_path);
    let mut scripts = format!(
        r#"<script src="{}" defer></script>"#,
        prefix.join(SCRIPT_FILE)
    );
    for extra in extra_scripts {
        scripts.push_str(&format!("\n<script src=\"{}\" defer></script>", prefix.join(extra)));
    }
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="{SITE_ROOT_META}" content="{prefix}">
<meta name="generator" content="groupsite {version}">
<title>{page_title} · {site_title}</title>
{scripts}
</head>
<body>
<main class="page-container">
{main}
</main>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION"),
        page_title = html_escape(page_title),
        site_title = html_escape(&site.title),
    )
}

/// `2003-04-01T09:40:00Z` -> `2003-04-01 09:40:00 +0000`; anything else verbatim.
pub fn format_timestamp(ts: Option<&str>) -> String {
    match ts {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S %z").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => String::new(),
    }
}

fn msg_link(prefix: RootPrefix, id: &str, label: &str) -> String {
    format!(
        r#"<a href="{}">{}</a>"#,
        prefix.join(&paths::message_path(id)),
        html_escape(label)
    )
}

pub fn render_message_page(site: &SiteMeta, rec: &MessageRecord, nav: &Neighbors) -> RenderedPage {
    let path = paths::message_path(&rec.id);
    let prefix = RootPrefix::for_page(&path);
    let subject = rec.display_subject();

    let links: Vec<String> = [
        (&nav.prev, "Prev"),
        (&nav.next, "Next"),
        (&nav.prev_in_thread, "Prev in thread"),
        (&nav.next_in_thread, "Next in thread"),
    ]
    .into_iter()
    .filter_map(|(target, label)| target.as_deref().map(|id| msg_link(prefix, id, label)))
    .collect();
    let msg_nav = if links.is_empty() {
        String::new()
    } else {
        format!("<p class=\"msg-nav\">{}</p>\n", links.join(" • "))
    };

    let main = format!(
        r#"<header>
<h1>{subject}</h1>
<p class="msg-meta">From: {author} • Date: {date}</p>
</header>
{msg_nav}<article class="msg-body" data-message-id="{id}">
{body}
</article>"#,
        subject = html_escape(&subject),
        author = html_escape(rec.display_author()),
        date = html_escape(&format_timestamp(rec.timestamp.as_deref())),
        id = html_escape(&rec.id),
        body = render_body(&rec.full_text),
    );
    RenderedPage::new(path.clone(), page_shell(site, &path, &subject, &main, &[]))
}

/// Message body as HTML.
///
/// Order: body already HTML, whole body base64, base64 MIME parts, then
/// escaped plain text in `<pre>`.
pub fn render_body(text: &str) -> String {
    let content = unescape_entities(text);
    if looks_like_html(&content) {
        return sanitize_html(&content);
    }
    if let Some(decoded) = decode_whole_base64(&content) {
        trace!(component = "renderer", "body decoded as whole-string base64");
        if looks_like_html(&decoded) {
            return sanitize_html(&decoded);
        }
        return pre_block(&decoded);
    }
    if let Some((combined, any_html)) = decode_base64_mime_parts(&content) {
        trace!(component = "renderer", any_html, "body decoded from base64 MIME parts");
        if any_html {
            return sanitize_html(&combined);
        }
        return pre_block(&combined);
    }
    pre_block(&content)
}

fn pre_block(text: &str) -> String {
    format!("<pre class=\"msg-text\">{}</pre>", html_escape(text))
}

/// Body that is nothing but base64 (whitespace ignored), decoded.
///
/// Decodings containing control characters are rejected so that long
/// alphanumeric words are not mistaken for base64.
pub fn decode_whole_base64(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !BASE64_ONLY_RE.is_match(&compact) {
        return None;
    }
    let decoded = bytes_to_text(&decode_base64_lenient(compact.as_bytes())?);
    let printable = decoded
        .chars()
        .all(|c| !c.is_control() || c.is_whitespace());
    printable.then_some(decoded)
}

/// Decode every `Content-Transfer-Encoding: base64` block found in a raw
/// body. Returns the joined parts and whether any part was `text/html`, or
/// `None` when the body has no such block.
pub fn decode_base64_mime_parts(text: &str) -> Option<(String, bool)> {
    let mut parts = Vec::new();
    let mut any_html = false;
    let mut pos = 0;
    while let Some(m) = B64_CTE_RE.find(&text[pos..]) {
        let header_idx = pos + m.start();
        let after_header = pos + m.end();
        let payload_start = after_header
            + BLANK_LINE_RE
                .find(&text[after_header..])
                .map(|b| b.end())
                .unwrap_or(0);
        let payload_end = BOUNDARY_LINE_RE
            .find(&text[payload_start..])
            .map(|b| payload_start + b.start())
            .unwrap_or(text.len());
        let payload = text[payload_start..payload_end].trim();

        let look_start = text[..header_idx].rfind("\n--").unwrap_or(0);
        let ctype = CONTENT_TYPE_RE
            .captures(&text[look_start..header_idx])
            .map(|c| c[1].to_ascii_lowercase())
            .unwrap_or_default();

        match decode_base64_lenient(payload.as_bytes()) {
            Some(raw) => {
                parts.push(bytes_to_text(&raw));
                any_html |= ctype.contains("html");
            }
            None => parts.push(payload.to_string()),
        }
        // an empty match range would loop forever
        pos = payload_end.max(after_header);
    }
    if parts.is_empty() {
        None
    } else {
        Some((parts.join("\n\n"), any_html))
    }
}

static SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(body_sanitizer);

/// Allowlist for archived mail bodies. Anything not listed here (script,
/// style, meta, base, form, link, iframe and friends) is dropped, and link
/// targets are limited to web and mail schemes.
fn body_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "b",
        "blockquote",
        "br",
        "center",
        "code",
        "dd",
        "div",
        "dl",
        "dt",
        "em",
        "font",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "small",
        "span",
        "strike",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "tt",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["title", "lang", "dir", "align"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["href", "title"]);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height"]);
    builder.add_tag_attributes("font", &["color", "face", "size"]);
    builder.add_tag_attributes("td", &["colspan", "rowspan"]);
    builder.add_tag_attributes("th", &["colspan", "rowspan"]);

    builder.url_schemes(HashSet::from(["http", "https", "mailto"]));
    builder.link_rel(Some("noopener noreferrer nofollow"));
    builder
}

/// Archived HTML reduced to an allowlist of passive markup.
pub fn sanitize_html(html: &str) -> String {
    let clean = SANITIZER.clean(html).to_string();
    trace!(
        component = "renderer",
        input = html.len(),
        output = clean.len(),
        "sanitized html body"
    );
    clean
}

/// Newest first; records without a timestamp last, in input order.
fn newest_first<'a>(records: &[&'a MessageRecord]) -> Vec<&'a MessageRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

fn listing_item(prefix: RootPrefix, rec: &MessageRecord, with_author: bool) -> String {
    let date = html_escape(&format_timestamp(rec.timestamp.as_deref()));
    let link = msg_link(prefix, &rec.id, &rec.display_subject());
    if with_author {
        format!("<li>{link} · {} · {date}</li>", html_escape(rec.display_author()))
    } else {
        format!("<li>{link} · {date}</li>")
    }
}

/// Records grouped by year label; numeric years newest first, `unknown` last.
pub fn group_by_year(records: &[MessageRecord]) -> Vec<(String, Vec<&MessageRecord>)> {
    let mut by_year: BTreeMap<Option<i32>, Vec<&MessageRecord>> = BTreeMap::new();
    for rec in records {
        by_year.entry(rec.year).or_default().push(rec);
    }
    let unknown = by_year.remove(&None);
    let mut out: Vec<(String, Vec<&MessageRecord>)> = by_year
        .into_iter()
        .rev()
        .map(|(year, recs)| (year.map(|y| y.to_string()).unwrap_or_default(), recs))
        .collect();
    if let Some(recs) = unknown {
        out.push(("unknown".to_string(), recs));
    }
    out
}

/// One author page: the display name, the file slug it is written under,
/// and the author's messages.
#[derive(Debug, Clone)]
pub struct AuthorGroup<'a> {
    pub name: String,
    pub slug: String,
    pub records: Vec<&'a MessageRecord>,
}

/// Records grouped by display author: message count descending, then
/// case-insensitive name. Slugs are unique within the result, so earlier
/// (more prolific) authors keep the bare slug on a collision.
pub fn group_by_author(records: &[MessageRecord]) -> Vec<AuthorGroup<'_>> {
    let mut by_author: BTreeMap<&str, Vec<&MessageRecord>> = BTreeMap::new();
    for rec in records {
        by_author.entry(rec.display_author()).or_default().push(rec);
    }
    let mut grouped: Vec<(&str, Vec<&MessageRecord>)> = by_author.into_iter().collect();
    grouped.sort_by(|a, b| {
        b.1.len()
            .cmp(&a.1.len())
            .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
    });
    let slugs = paths::unique_slugs(grouped.iter().map(|(name, _)| *name));
    grouped
        .into_iter()
        .zip(slugs)
        .map(|((name, records), slug)| AuthorGroup {
            name: name.to_string(),
            slug,
            records,
        })
        .collect()
}

pub fn render_year_page(site: &SiteMeta, year: &str, records: &[&MessageRecord]) -> RenderedPage {
    let path = paths::year_path(year);
    let prefix = RootPrefix::for_page(&path);
    let items: Vec<String> = newest_first(records)
        .into_iter()
        .map(|rec| listing_item(prefix, rec, true))
        .collect();
    let title = format!("Messages from {year}");
    let main = format!(
        "<h1>{}</h1>\n<p><a href=\"index.html\">Back to browse index</a></p>\n<ul class=\"msg-list\">\n{}\n</ul>",
        html_escape(&title),
        items.join("\n")
    );
    RenderedPage::new(path.clone(), page_shell(site, &path, &title, &main, &[]))
}

pub fn render_author_page(site: &SiteMeta, author: &AuthorGroup<'_>) -> RenderedPage {
    let path = paths::author_path(&author.slug);
    let prefix = RootPrefix::for_page(&path);
    let items: Vec<String> = newest_first(&author.records)
        .into_iter()
        .map(|rec| listing_item(prefix, rec, false))
        .collect();
    let title = format!("Messages by {}", author.name);
    let main = format!(
        "<h1>{}</h1>\n<p><a href=\"index.html\">All authors</a> · <a href=\"../index.html\">Back to browse index</a></p>\n<ul class=\"msg-list\">\n{}\n</ul>",
        html_escape(&title),
        items.join("\n")
    );
    RenderedPage::new(path.clone(), page_shell(site, &path, &title, &main, &[]))
}

pub fn render_authors_index(site: &SiteMeta, authors: &[AuthorGroup<'_>]) -> RenderedPage {
    let path = format!("{BROWSE_DIR}/{}/index.html", paths::AUTHORS_DIR);
    let items: Vec<String> = authors
        .iter()
        .map(|author| {
            format!(
                "<li><a href=\"{}.html\">{}</a> ({})</li>",
                author.slug,
                html_escape(&author.name),
                author.records.len()
            )
        })
        .collect();
    let main = format!(
        "<h1>Browse by author</h1>\n<ul class=\"author-list\">\n{}\n</ul>",
        items.join("\n")
    );
    RenderedPage::new(path.clone(), page_shell(site, &path, "Authors", &main, &[]))
}

pub fn render_browse_index(site: &SiteMeta, years: &[(String, Vec<&MessageRecord>)]) -> RenderedPage {
    let path = format!("{BROWSE_DIR}/index.html");
    let items: Vec<String> = years
        .iter()
        .map(|(year, recs)| {
            format!(
                "<li><a href=\"{}.html\">{}</a> ({})</li>",
                urlencoding::encode(year),
                html_escape(year),
                recs.len()
            )
        })
        .collect();
    let main = format!(
        "<h1>Browse messages</h1>\n<p>Years:</p>\n<ul class=\"year-list\">\n{}\n</ul>\n<p><a href=\"../{HOME_PAGE}\">Search</a></p>\n<p><a href=\"{}/index.html\">Browse by author</a></p>",
        items.join("\n"),
        paths::AUTHORS_DIR
    );
    RenderedPage::new(path.clone(), page_shell(site, &path, "Browse", &main, &[]))
}

pub fn render_home_page(site: &SiteMeta, message_count: usize) -> RenderedPage {
    let path = HOME_PAGE.to_string();
    let main = format!(
        r#"<h1>{title}</h1>
<p class="lede">{message_count} archived messages. Search above or <a href="{BROWSE_DIR}/index.html">browse by year</a>.</p>
<p id="search-status" class="search-status" aria-live="polite"></p>
<ol id="search-results" class="search-results"></ol>"#,
        title = html_escape(&site.title),
    );
    RenderedPage::new(path.clone(), page_shell(site, &path, "Search", &main, &[SEARCH_SCRIPT_FILE]))
}
