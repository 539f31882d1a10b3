//! The shared navigation fragment (`nav.html`).
//!
//! The fragment is location-agnostic: links name root-relative targets in
//! `data-root-link` and the bootstrap rewrites `href`/`action` per page.

use super::paths::{AUTHORS_DIR, BROWSE_DIR, HOME_PAGE};
use crate::archive::html_text::html_escape;

pub const NAV_FILE: &str = "nav.html";
pub const ROOT_LINK_ATTR: &str = "data-root-link";
pub const SEARCH_FORM_ID: &str = "site-search";
pub const SEARCH_INPUT_ID: &str = "site-search-input";
/// Input id used by older fragments.
pub const LEGACY_SEARCH_INPUT_ID: &str = "search-input";
pub const QUERY_KEY: &str = "q";

pub fn render_nav(title: &str) -> String {
    let title = html_escape(title);
    let browse = format!("{BROWSE_DIR}/index.html");
    let authors = format!("{BROWSE_DIR}/{AUTHORS_DIR}/index.html");
    format!(
        r#"<nav id="site-nav" class="site-nav">
  <a class="site-title" {ROOT_LINK_ATTR}="{HOME_PAGE}" href="{HOME_PAGE}">{title}</a>
  <a {ROOT_LINK_ATTR}="{HOME_PAGE}" href="{HOME_PAGE}">Search</a>
  <a {ROOT_LINK_ATTR}="{browse}" href="{browse}">Browse</a>
  <a {ROOT_LINK_ATTR}="{authors}" href="{authors}">Authors</a>
  <form id="{SEARCH_FORM_ID}" action="{HOME_PAGE}" method="get" role="search">
    <input id="{SEARCH_INPUT_ID}" name="{QUERY_KEY}" type="search" placeholder="Search messages" aria-label="Search messages">
    <button type="submit">Search</button>
  </form>
</nav>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_carries_root_links_and_search_form() {
        let nav = render_nav("Box <Club>");
        assert!(nav.contains("Box &lt;Club&gt;"));
        assert_eq!(nav.matches(ROOT_LINK_ATTR).count(), 4);
        assert!(nav.contains(r#"data-root-link="browse/authors/index.html""#));
        assert!(nav.contains(r#"<form id="site-search""#));
        assert!(nav.contains(r#"id="site-search-input" name="q""#));
    }
}
