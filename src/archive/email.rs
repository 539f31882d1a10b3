//! RFC 822 / MIME message bodies to display text.
//!
//! Only what the archive needs: header unfolding, `multipart/*` splitting,
//! `base64` and `quoted-printable` transfer encodings, and a text/plain over
//! text/html preference.

use base64::prelude::*;

use super::html_text::strip_html;

/// Decode a raw email into plain text.
///
/// Prefers `text/plain` parts; `text/html` parts are stripped to text. If
/// nothing usable is found the raw message is returned with CRLF normalised.
pub fn email_to_text(raw: &str) -> String {
    let part = MimePart::parse(raw.as_bytes());
    let mut parts = Vec::new();
    if part.is_multipart() {
        collect_text(&part, &mut parts, 0);
    } else {
        let content = part.decoded_text();
        match part.mime_type.as_str() {
            "text/html" => parts.push(strip_html(&content)),
            _ => parts.push(content),
        }
    }
    let text = parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        raw.replace("\r\n", "\n")
    } else {
        text.to_string()
    }
}

const MAX_MIME_DEPTH: usize = 16;

fn collect_text(part: &MimePart, out: &mut Vec<String>, depth: usize) {
    if depth > MAX_MIME_DEPTH {
        return;
    }
    if part.is_multipart() {
        for child in part.children() {
            collect_text(&child, out, depth + 1);
        }
        return;
    }
    match part.mime_type.as_str() {
        "text/plain" => out.push(part.decoded_text()),
        "text/html" => out.push(strip_html(&part.decoded_text())),
        _ => {}
    }
}

/// A parsed MIME entity: its headers and undecoded body.
#[derive(Debug, Clone)]
pub struct MimePart {
    headers: Vec<(String, String)>,
    pub mime_type: String,
    params: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MimePart {
    pub fn parse(raw: &[u8]) -> Self {
        let (head, body) = split_head_body(raw);
        let headers = parse_headers(&String::from_utf8_lossy(head));
        let content_type = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let (mime_type, params) = parse_content_type(&content_type);
        Self {
            headers,
            mime_type,
            params,
            body: body.to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type.starts_with("multipart/") && self.param("boundary").is_some()
    }

    /// Child entities of a multipart body; empty for leaf parts.
    pub fn children(&self) -> Vec<MimePart> {
        let Some(boundary) = self.param("boundary") else {
            return Vec::new();
        };
        split_multipart(&self.body, boundary)
            .into_iter()
            .map(MimePart::parse)
            .collect()
    }

    /// Body bytes with the transfer encoding removed.
    pub fn decoded_body(&self) -> Vec<u8> {
        let encoding = self
            .header("content-transfer-encoding")
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match encoding.as_str() {
            "base64" => decode_base64_lenient(&self.body).unwrap_or_else(|| self.body.clone()),
            "quoted-printable" => decode_quoted_printable(&self.body),
            _ => self.body.clone(),
        }
    }

    /// Decoded body as text; invalid UTF-8 falls back to Latin-1.
    pub fn decoded_text(&self) -> String {
        bytes_to_text(&self.decoded_body()).replace("\r\n", "\n")
    }
}

fn split_head_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, 4));
    let lf = find(raw, b"\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((idx, sep)) => (&raw[..idx], &raw[idx + sep..]),
        None => (raw, &[]),
    }
}

fn parse_headers(head: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

/// Split `type/subtype; key=value; key="quoted"` into a lowercased type and params.
fn parse_content_type(value: &str) -> (String, Vec<(String, String)>) {
    let mut pieces = value.split(';');
    let mime_type = pieces
        .next()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| t.contains('/'))
        .unwrap_or_else(|| "text/plain".to_string());
    let params = pieces
        .filter_map(|p| {
            let (k, v) = p.split_once('=')?;
            Some((
                k.trim().to_ascii_lowercase(),
                v.trim().trim_matches('"').to_string(),
            ))
        })
        .collect();
    (mime_type, params)
}

fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let text = body;
    let mut parts = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut pos = 0;
    while pos < text.len() {
        let line_end = text[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(text.len());
        let line = trim_line_end(&text[pos..line_end]);
        if line.starts_with(delimiter.as_bytes()) {
            let rest = &line[delimiter.len()..];
            if let Some(start) = current_start {
                parts.push(trim_line_end(&text[start..pos]));
            }
            if rest.starts_with(b"--") {
                return parts;
            }
            current_start = Some(line_end);
        }
        pos = line_end;
    }
    if let Some(start) = current_start
        && start < text.len()
    {
        parts.push(&text[start..]);
    }
    parts
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Base64 with embedded whitespace removed; `None` if the remainder is not valid.
pub fn decode_base64_lenient(data: &[u8]) -> Option<Vec<u8>> {
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    BASE64_STANDARD.decode(&compact).ok()
}

fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'=' {
            // soft line break
            if data.get(i + 1) == Some(&b'\r') && data.get(i + 2) == Some(&b'\n') {
                i += 3;
                continue;
            }
            if data.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            if let (Some(&h), Some(&l)) = (data.get(i + 1), data.get(i + 2))
                && let (Some(h), Some(l)) = (hex_val(h), hex_val(l))
            {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// UTF-8 if valid, otherwise each byte as a Latin-1 code point.
pub fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_body() {
        let raw = "From: a@b.c\r\nSubject: hi\r\n\r\nHello there\r\nSecond line\r\n";
        assert_eq!(email_to_text(raw), "Hello there\nSecond line");
    }

    #[test]
    fn html_only_message_is_stripped() {
        let raw = "Content-Type: text/html; charset=utf-8\n\n<p>Hi <b>all</b></p>";
        assert_eq!(email_to_text(raw), "Hi all");
    }

    #[test]
    fn multipart_prefers_both_text_parts_in_order() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n",
            "\r\n",
            "preamble\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain version\r\n",
            "--XYZ\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<div>html version</div>\r\n",
            "--XYZ\r\n",
            "Content-Type: image/png\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "iVBORw0KGgo=\r\n",
            "--XYZ--\r\n",
            "epilogue\r\n",
        );
        assert_eq!(email_to_text(raw), "plain version\nhtml version");
    }

    #[test]
    fn nested_multipart_and_base64() {
        let encoded = BASE64_STANDARD.encode("caf\u{e9} au lait");
        let raw = format!(
            "Content-Type: multipart/mixed; boundary=outer\n\n--outer\nContent-Type: multipart/alternative; boundary=inner\n\n--inner\nContent-Type: text/plain; charset=utf-8\nContent-Transfer-Encoding: base64\n\n{encoded}\n--inner--\n--outer--\n"
        );
        assert_eq!(email_to_text(&raw), "caf\u{e9} au lait");
    }

    #[test]
    fn quoted_printable_soft_breaks_and_escapes() {
        let raw = "Content-Transfer-Encoding: quoted-printable\n\nfoo=3Dbar long=\nline caf=C3=A9";
        assert_eq!(email_to_text(raw), "foo=bar longline caf\u{e9}");
    }

    #[test]
    fn folded_headers_are_unfolded() {
        let part = MimePart::parse(b"Content-Type: multipart/mixed;\r\n\tboundary=\"b1\"\r\n\r\n");
        assert_eq!(part.mime_type, "multipart/mixed");
        assert_eq!(part.param("boundary"), Some("b1"));
    }

    #[test]
    fn empty_result_falls_back_to_raw() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\nContent-Type: image/gif\r\n\r\nGIF89a\r\n--b--\r\n";
        assert_eq!(email_to_text(raw), raw.replace("\r\n", "\n"));
    }

    #[test]
    fn latin1_fallback() {
        assert_eq!(bytes_to_text(&[0x63, 0x61, 0x66, 0xe9]), "caf\u{e9}");
    }
}
