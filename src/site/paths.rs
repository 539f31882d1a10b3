//! Site layout: where pages live and how a page addresses the site root.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

pub const HOME_PAGE: &str = "index.html";
pub const MSG_DIR: &str = "msg";
pub const BROWSE_DIR: &str = "browse";
pub const AUTHORS_DIR: &str = "authors";

/// Subtrees recognised when a page does not declare its root prefix.
static SUBTREE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:msg|browse)/").expect("subtree regex"));

static SLUG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>"']"#).expect("slug strip regex"));
static SLUG_NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug alnum regex"));

/// Declared root prefixes: `/`-separated segments that are each empty, `.`
/// or `..`. Shared with `site.js`, so it stays within the syntax both regex
/// engines agree on.
pub const ROOT_PREFIX_PATTERN: &str = r"^\.{0,2}(?:/\.{0,2})*$";

static ROOT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(ROOT_PREFIX_PATTERN).expect("root prefix regex"));

/// Relative path from a page to the site root: `./`, `../`, `../../`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RootPrefix {
    depth: usize,
}

impl RootPrefix {
    pub const SAME_DIR: RootPrefix = RootPrefix { depth: 0 };
    pub const ONE_UP: RootPrefix = RootPrefix { depth: 1 };

    pub fn from_depth(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_same_dir(&self) -> bool {
        self.depth == 0
    }

    /// Parse a declared prefix (`""`, `"."`, `"./"`, `"../"`, `"../../"`).
    ///
    /// Anything other than a run of `..` segments is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if !ROOT_PREFIX_RE.is_match(trimmed) {
            return None;
        }
        let depth = trimmed.split('/').filter(|s| *s == "..").count();
        Some(Self { depth })
    }

    /// Prefix for a page at `rel_path` (site-relative, `/`-separated).
    pub fn for_page(rel_path: &str) -> Self {
        let depth = rel_path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .count()
            .saturating_sub(1);
        Self { depth }
    }

    /// Fallback classification from the URL path alone.
    ///
    /// Closed set: a path inside `/msg/` or `/browse/` is one level down,
    /// everything else is at the root.
    pub fn classify_path(path: &str) -> Self {
        if SUBTREE_RE.is_match(path) {
            Self::ONE_UP
        } else {
            Self::SAME_DIR
        }
    }

    pub fn as_str(&self) -> String {
        if self.depth == 0 {
            "./".to_string()
        } else {
            "../".repeat(self.depth)
        }
    }

    /// Join a root-relative target onto this prefix.
    pub fn join(&self, target: &str) -> String {
        format!("{}{}", self.as_str(), target.trim_start_matches('/'))
    }
}

impl fmt::Display for RootPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// True for the home/search page: a root-level page whose path is the
/// directory itself or `index.html`.
pub fn is_home_path(path: &str, prefix: RootPrefix) -> bool {
    prefix.is_same_dir()
        && (path.is_empty()
            || path.ends_with('/')
            || path == HOME_PAGE
            || path.ends_with(&format!("/{HOME_PAGE}")))
}

/// Filesystem-safe slug for an author name.
pub fn slugify(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let stripped = SLUG_STRIP_RE.replace_all(&lowered, "");
    let at = stripped.replace('@', "-at-");
    let dashed = SLUG_NON_ALNUM_RE.replace_all(&at, "-");
    let slug = dashed.trim_matches('-');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}

/// One slug per name, in order. Names whose slugs collide (case variants,
/// punctuation-only differences) get `-2`, `-3`, ... suffixes, and `index`
/// is never handed out since it names the listing page of the same directory.
pub fn unique_slugs<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let reserved = HOME_PAGE.trim_end_matches(".html");
    let mut taken: HashSet<String> = HashSet::from([reserved.to_string()]);
    names
        .into_iter()
        .map(|name| {
            let base = slugify(name);
            let mut slug = base.clone();
            let mut n = 2;
            while taken.contains(&slug) {
                slug = format!("{base}-{n}");
                n += 1;
            }
            taken.insert(slug.clone());
            slug
        })
        .collect()
}

/// File name of a message page, percent-encoded for use in links.
pub fn message_file(id: &str, ext: &str) -> String {
    format!("{}.{ext}", urlencoding::encode(id))
}

/// True when `id` can be used verbatim as a file name stem.
pub fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

/// Site-relative path of a message page.
pub fn message_path(id: &str) -> String {
    format!("{MSG_DIR}/{}", message_file(id, "html"))
}

/// Site-relative path of a year listing.
pub fn year_path(year: &str) -> String {
    format!("{BROWSE_DIR}/{}.html", urlencoding::encode(year))
}

/// Site-relative path of an author page.
pub fn author_path(slug: &str) -> String {
    format!("{BROWSE_DIR}/{AUTHORS_DIR}/{slug}.html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_and_subtree_classification() {
        assert_eq!(RootPrefix::classify_path("/index.html"), RootPrefix::SAME_DIR);
        assert_eq!(RootPrefix::classify_path("/"), RootPrefix::SAME_DIR);
        assert_eq!(RootPrefix::classify_path("/msg/12.html"), RootPrefix::ONE_UP);
        assert_eq!(RootPrefix::classify_path("/archive/browse/2001.html"), RootPrefix::ONE_UP);
        assert_eq!(RootPrefix::classify_path("/message.html"), RootPrefix::SAME_DIR);
    }

    #[test]
    fn prefix_strings_and_join() {
        assert_eq!(RootPrefix::SAME_DIR.as_str(), "./");
        assert_eq!(RootPrefix::ONE_UP.join("index.html"), "../index.html");
        assert_eq!(RootPrefix::from_depth(2).join("/browse/index.html"), "../../browse/index.html");
    }

    #[test]
    fn parse_declared_prefix() {
        assert_eq!(RootPrefix::parse(""), Some(RootPrefix::SAME_DIR));
        assert_eq!(RootPrefix::parse("./"), Some(RootPrefix::SAME_DIR));
        assert_eq!(RootPrefix::parse("../../"), Some(RootPrefix::from_depth(2)));
        assert_eq!(RootPrefix::parse("../x/"), None);
    }

    #[test]
    fn page_depth_from_relative_path() {
        assert_eq!(RootPrefix::for_page("index.html").depth(), 0);
        assert_eq!(RootPrefix::for_page("msg/1.html").depth(), 1);
        assert_eq!(RootPrefix::for_page("browse/authors/frank.html").depth(), 2);
    }

    #[test]
    fn home_detection() {
        assert!(is_home_path("/", RootPrefix::SAME_DIR));
        assert!(is_home_path("/index.html", RootPrefix::SAME_DIR));
        assert!(is_home_path("/archive/", RootPrefix::SAME_DIR));
        assert!(!is_home_path("/browse/index.html", RootPrefix::ONE_UP));
        assert!(!is_home_path("/about.html", RootPrefix::SAME_DIR));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Frank Smith <frank@example.com>"), "frank-smith-frank-at-example-com");
        assert_eq!(slugify("  "), "unknown");
        assert_eq!(slugify("O'Brien"), "obrien");
    }

    #[test]
    fn colliding_slugs_are_suffixed() {
        let slugs = unique_slugs(["Frank", "frank", "Index", "FRANK!", "frank-2", "index"]);
        assert_eq!(slugs, ["frank", "frank-2", "index-2", "frank-3", "frank-2-2", "index-3"]);
    }

    #[test]
    fn message_ids_are_encoded() {
        assert_eq!(message_path("12"), "msg/12.html");
        assert_eq!(message_path("a b/c"), "msg/a%20b%2Fc.html");
    }

    #[test]
    fn unsafe_file_stems() {
        assert!(is_safe_file_stem("12"));
        assert!(is_safe_file_stem("a b"));
        assert!(!is_safe_file_stem(""));
        assert!(!is_safe_file_stem(".."));
        assert!(!is_safe_file_stem("../x"));
        assert!(!is_safe_file_stem("a\\b"));
    }

    proptest! {
        #[test]
        fn parse_inverts_as_str(depth in 0usize..8) {
            let prefix = RootPrefix::from_depth(depth);
            prop_assert_eq!(RootPrefix::parse(&prefix.as_str()), Some(prefix));
        }

        #[test]
        fn parse_accepts_exactly_dot_segments(value in "[./a ]{0,10}") {
            let trimmed = value.trim();
            let segments_ok = trimmed.split('/').all(|s| matches!(s, "" | "." | ".."));
            prop_assert_eq!(RootPrefix::parse(&value).is_some(), segments_ok);
        }

        #[test]
        fn slug_is_always_safe(name in ".{0,40}") {
            let slug = slugify(&name);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }
}
