//! Shared fixtures for integration tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A message object the way the group API returns it.
#[allow(dead_code)]
pub fn api_message(id: u64, topic: u64, author: &str, subject: &str, post_date: i64, body: &str) -> Value {
    json!({
        "msgId": id,
        "topicId": topic,
        "authorName": author,
        "subject": subject,
        "postDate": post_date.to_string(),
        "rawEmail": format!("From: {author}\nSubject: {subject}\n\n{body}"),
    })
}

/// Builds an uncompressed WARC file record by record.
#[allow(dead_code)]
#[derive(Default)]
pub struct WarcFixture {
    bytes: Vec<u8>,
    count: usize,
}

#[allow(dead_code)]
impl WarcFixture {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(mut self, warc_type: &str, uri: &str, content_type: &str, payload: &[u8]) -> Self {
        self.count += 1;
        let head = format!(
            "WARC/1.0\r\nWARC-Type: {warc_type}\r\nWARC-Record-ID: <urn:uuid:fixture-{n}>\r\nWARC-Target-URI: {uri}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\n\r\n",
            n = self.count,
            len = payload.len()
        );
        self.bytes.extend_from_slice(head.as_bytes());
        self.bytes.extend_from_slice(payload);
        self.bytes.extend_from_slice(b"\r\n\r\n");
        self
    }

    /// A JSON `resource` record holding an API page of messages.
    pub fn messages(self, uri: &str, messages: &[Value]) -> Self {
        let body = json!({ "ygData": { "messages": messages } }).to_string();
        self.record("resource", uri, "application/json", body.as_bytes())
    }

    /// An HTTP `response` record with the given content type.
    pub fn response(self, uri: &str, content_type: &str, body: &[u8]) -> Self {
        let mut payload = format!("HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\n\r\n").into_bytes();
        payload.extend_from_slice(body);
        self.record("response", uri, "application/http; msgtype=response", &payload)
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        std::fs::write(path, &self.bytes).unwrap();
        path.to_path_buf()
    }
}

/// Three messages across two years and two threads.
#[allow(dead_code)]
pub fn sample_archive(dir: &Path) -> PathBuf {
    WarcFixture::new()
        .messages(
            "https://groups.example/api/v1/groups/g/messages?start=1",
            &[
                api_message(1, 1, "Frank", "Box office numbers", 1_041_379_200, "The box was empty."),
                api_message(2, 1, "Ada <ada@example.org>", "Re: Box office numbers", 1_041_465_600, "Consumption is up."),
            ],
        )
        .messages(
            "https://groups.example/api/v1/groups/g/messages?start=3",
            &[api_message(3, 3, "Frank", "New year", 1_072_915_200, "Happy 2004.")],
        )
        .response("https://groups.example/files/plan.pdf", "application/pdf", b"%PDF-1.4 fixture")
        .write_to(&dir.join("capture.warc"))
}

/// Config file pinning every directory under `root`.
#[allow(dead_code)]
pub fn write_config(root: &Path) -> PathBuf {
    let path = root.join("groupsite.toml");
    let toml = format!(
        "out_dir = {out:?}\nsite_dir = {site:?}\ndata_dir = {data:?}\ntitle = \"Fixture Group\"\nbase_url = \"http://archive.test/g/\"\n",
        out = root.join("out").display().to_string(),
        site = root.join("site").display().to_string(),
        data = root.display().to_string(),
    );
    std::fs::write(&path, toml).unwrap();
    path
}
