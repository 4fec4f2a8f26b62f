//! HTTP/1.1 request and response values for a single exchange.
//!
//! # Design
//! `HttpRequest` is plain data with a deterministic wire rendering: the
//! header vector is emitted in order, so the same inputs always produce
//! byte-identical request text. `HttpResponse` wraps exactly the bytes that
//! were captured from the socket. Its accessors parse the head with
//! `httparse` once, on construction, and every slice they hand out is
//! bounded by the captured length. A capture cut short by the size limit
//! still answers what it can (status line, partial body) and reports
//! `is_truncated()`.

use std::borrow::Cow;
use std::fmt::{self, Write as _};

/// Headers beyond this count make the head unparseable. Capture framing
/// then falls back to a line scan in `connection`.
const MAX_HEADERS: usize = 64;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by the `Probe::build_*` methods and rendered with [`to_wire`].
///
/// [`to_wire`]: HttpRequest::to_wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Render the exact request text, CRLF line endings included.
    pub fn to_wire(&self) -> String {
        let mut wire = String::with_capacity(128 + self.body.as_ref().map_or(0, String::len));
        // Writing into a String cannot fail.
        let _ = write!(wire, "{} {} HTTP/1.1\r\n", self.method, self.path);
        for (name, value) in &self.headers {
            let _ = write!(wire, "{name}: {value}\r\n");
        }
        wire.push_str("\r\n");
        if let Some(body) = &self.body {
            wire.push_str(body);
        }
        wire
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status line and headers of a response, as parsed by `httparse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: u8,
    pub code: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    /// Byte length of the head, including the blank line.
    pub len: usize,
}

impl ResponseHead {
    /// Parse a complete head from the start of `raw`.
    ///
    /// Returns `None` while the head is still incomplete or if it is not
    /// valid HTTP/1.x.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut response = httparse::Response::new(&mut headers);
        match response.parse(raw) {
            Ok(httparse::Status::Complete(len)) => Some(Self {
                version: response.version?,
                code: response.code?,
                reason: response.reason.unwrap_or_default().to_string(),
                headers: response
                    .headers
                    .iter()
                    .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                    .collect(),
                len,
            }),
            Ok(httparse::Status::Partial) | Err(_) => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared body length, if the server sent a parseable one.
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// Whether the status code forbids a message body.
    pub fn is_bodiless(&self) -> bool {
        is_bodiless_status(self.code)
    }
}

pub(crate) fn is_bodiless_status(code: u16) -> bool {
    (100..200).contains(&code) || code == 204 || code == 304
}

/// The bytes captured for one exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    raw: Vec<u8>,
    head: Option<ResponseHead>,
    truncated: bool,
}

impl HttpResponse {
    pub fn from_bytes(raw: Vec<u8>, truncated: bool) -> Self {
        let head = ResponseHead::parse(&raw);
        Self {
            raw,
            head,
            truncated,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// True when the capture stopped at the size limit before the server
    /// finished sending.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    /// Everything received, decoded lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// The first line of the response, without its line ending.
    pub fn status_line(&self) -> Cow<'_, str> {
        let end = self
            .raw
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(self.raw.len());
        let line = self.raw[..end].strip_suffix(b"\r").unwrap_or(&self.raw[..end]);
        String::from_utf8_lossy(line)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.head.as_ref().map(|h| h.code)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.as_ref()?.header(name)
    }

    /// Bytes after the head.
    ///
    /// When the head could not be parsed the body starts after the first
    /// blank line, and is empty if there is none.
    pub fn body(&self) -> &[u8] {
        let start = match &self.head {
            Some(head) => head.len,
            None => match find(&self.raw, b"\r\n\r\n") {
                Some(pos) => pos + 4,
                None => return &[],
            },
        };
        &self.raw[start..]
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }

    /// Value of the cookie `name` set through any `Set-Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        let head = self.head.as_ref()?;
        head.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, v)| v.split(';').next()?.trim().split_once('='))
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

/// Byte-wise substring search.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
