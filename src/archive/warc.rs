//! WARC record framing.
//!
//! Reads the record envelope only (version line, named headers, a
//! `Content-Length` payload). Payloads are handed back untouched; callers
//! decide what, if anything, to parse out of them.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use super::ArchiveError;

/// One WARC record: ordered headers plus the raw content block.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    pub version: String,
    headers: Vec<(String, String)>,
    payload: Vec<u8>,
}

impl WarcRecord {
    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn warc_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.header("WARC-Target-URI")
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Header block of an embedded HTTP message (`response`/`request` records).
    ///
    /// Returns `None` when the payload does not start with an HTTP status or
    /// request line.
    pub fn http_headers(&self) -> Option<Vec<(String, String)>> {
        let end = find_subslice(&self.payload, b"\r\n\r\n")
            .or_else(|| find_subslice(&self.payload, b"\n\n"))?;
        let head = String::from_utf8_lossy(&self.payload[..end]);
        let mut lines = head.lines();
        let first = lines.next()?;
        if !first.starts_with("HTTP/") && !first.contains(" HTTP/") {
            return None;
        }
        Some(lines.filter_map(split_header_line).collect())
    }

    /// Case-insensitive lookup in [`WarcRecord::http_headers`].
    pub fn http_header(&self, name: &str) -> Option<String> {
        self.http_headers()?
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Streaming reader over concatenated WARC records.
pub struct WarcReader<R> {
    inner: R,
    offset: u64,
    done: bool,
}

impl WarcReader<Box<dyn BufRead>> {
    /// Open a capture file, decompressing when the name ends in `.gz`/`.gzip`.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path.to_string_lossy().to_ascii_lowercase();
        let inner: Box<dyn BufRead> = if name.ends_with(".gz") || name.ends_with(".gzip") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(inner))
    }
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            done: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, ArchiveError> {
        let mut buf = Vec::new();
        let n = self
            .inner
            .read_until(b'\n', &mut buf)
            .map_err(|source| ArchiveError::Io {
                offset: self.offset,
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Read the next record, or `None` at a clean end of input.
    pub fn next_record(&mut self) -> Result<Option<WarcRecord>, ArchiveError> {
        // Records are separated by blank lines; tolerate any number of them.
        let version = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let record_start = self.offset;
        if !version.starts_with("WARC/") {
            return Err(ArchiveError::Malformed {
                offset: record_start,
                reason: format!("expected WARC version line, found {version:?}"),
            });
        }

        let mut headers: Vec<(String, String)> = Vec::new();
        loop {
            let Some(line) = self.read_line()? else {
                return Err(ArchiveError::Malformed {
                    offset: self.offset,
                    reason: "unexpected end of input in header block".to_string(),
                });
            };
            if line.is_empty() {
                break;
            }
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            match split_header_line(&line) {
                Some(pair) => headers.push(pair),
                None => {
                    return Err(ArchiveError::Malformed {
                        offset: self.offset,
                        reason: format!("header line without ':' ({line:?})"),
                    });
                }
            }
        }

        let length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
            .and_then(|(_, v)| v.trim().parse::<u64>().ok())
            .ok_or(ArchiveError::Malformed {
                offset: self.offset,
                reason: "missing or invalid Content-Length".to_string(),
            })?;

        let mut payload = Vec::with_capacity(length.min(64 * 1024 * 1024) as usize);
        let read = (&mut self.inner)
            .take(length)
            .read_to_end(&mut payload)
            .map_err(|source| ArchiveError::Io {
                offset: self.offset,
                source,
            })?;
        self.offset += read as u64;
        if (read as u64) < length {
            return Err(ArchiveError::Malformed {
                offset: self.offset,
                reason: format!("truncated payload: expected {length} bytes, got {read}"),
            });
        }

        Ok(Some(WarcRecord {
            version,
            headers,
            payload,
        }))
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<WarcRecord, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn split_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(kind: &str, ctype: &str, body: &str) -> String {
        format!(
            "WARC/1.0\r\nWARC-Type: {kind}\r\nContent-Type: {ctype}\r\nContent-Length: {}\r\n\r\n{body}\r\n\r\n",
            body.len()
        )
    }

    #[test]
    fn reads_consecutive_records() {
        let data = format!(
            "{}{}",
            record("resource", "application/json", "{\"a\":1}"),
            record("metadata", "text/plain", "hello\r\n\r\nworld")
        );
        let records: Vec<_> = WarcReader::new(Cursor::new(data))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].warc_type(), Some("resource"));
        assert_eq!(records[0].payload(), b"{\"a\":1}");
        assert_eq!(records[1].content_type(), Some("text/plain"));
        assert_eq!(records[1].payload(), b"hello\r\n\r\nworld");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let data = record("resource", "application/json", "{}");
        let rec = WarcReader::new(Cursor::new(data)).next().unwrap().unwrap();
        assert_eq!(rec.header("warc-type"), Some("resource"));
        assert_eq!(rec.version, "WARC/1.0");
    }

    #[test]
    fn truncated_payload_is_reported() {
        let data = "WARC/1.0\r\nWARC-Type: resource\r\nContent-Length: 50\r\n\r\nshort";
        let err = WarcReader::new(Cursor::new(data)).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("truncated payload"), "{err}");
    }

    #[test]
    fn garbage_is_malformed_and_iteration_stops() {
        let mut reader = WarcReader::new(Cursor::new("not a warc file\n"));
        assert!(matches!(
            reader.next(),
            Some(Err(ArchiveError::Malformed { .. }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn http_headers_of_response_record() {
        let body = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Disposition: attachment\r\n\r\n\u{1}\u{2}";
        let data = record("response", "application/http; msgtype=response", body);
        let rec = WarcReader::new(Cursor::new(data)).next().unwrap().unwrap();
        assert_eq!(rec.http_header("content-type").as_deref(), Some("image/png"));
        assert_eq!(
            rec.http_header("Content-Disposition").as_deref(),
            Some("attachment")
        );
    }

    #[test]
    fn gzip_capture_is_decompressed() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("capture.warc.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(record("resource", "application/json", "[]").as_bytes())
            .unwrap();
        enc.finish().unwrap();

        let records: Vec<_> = WarcReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload(), b"[]");
    }
}
