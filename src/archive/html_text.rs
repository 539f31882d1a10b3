//! HTML to plain text for message bodies, and the inverse escaping used by the
//! page renderer.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script regex"));
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style regex"));
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>").expect("br regex"));
static P_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</\s*p\s*>").expect("p regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static HSPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\x0C\x0B]+").expect("space regex"));
static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("blank run regex"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("entity regex"));
static HTML_TAG_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?\w+>").expect("tag hint regex"));

/// Reduce an HTML body to readable text.
pub fn strip_html(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s = unescape_entities(s);
    let s = SCRIPT_RE.replace_all(&s, "");
    let s = STYLE_RE.replace_all(&s, "");
    let s = BR_RE.replace_all(&s, "\n");
    let s = P_CLOSE_RE.replace_all(&s, "\n");
    let s = TAG_RE.replace_all(&s, "");
    let s = HSPACE_RE.replace_all(&s, " ");
    let s = BLANK_RUN_RE.replace_all(&s, "\n\n");
    s.trim().to_string()
}

/// True when the text contains something that looks like an HTML tag.
pub fn looks_like_html(s: &str) -> bool {
    HTML_TAG_HINT_RE.is_match(s)
}

/// Decode named and numeric character references. Unknown names are kept verbatim.
pub fn unescape_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(num) = body.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32).map(String::from)
            } else {
                named_entity(body).map(String::from)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "eacute" => "\u{e9}",
        "egrave" => "\u{e8}",
        "uuml" => "\u{fc}",
        "ouml" => "\u{f6}",
        "auml" => "\u{e4}",
        _ => return None,
    })
}

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
