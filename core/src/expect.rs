//! Predicates over a captured response.
//!
//! # Design
//! An `Expectation` is a value, so scenario steps can carry what they
//! require alongside what they send. Evaluation never panics and never
//! aborts; it returns an `ExpectationFailure` with a short excerpt of what
//! was actually received, and the caller decides what a failure means.

use std::fmt;

use crate::error::ExpectationFailure;
use crate::http::{find, HttpResponse};

/// Longest excerpt of the body quoted back in a failure.
const EXCERPT_CHARS: usize = 200;

/// What a correct response must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// The status line contains this text, e.g. `HTTP/1.1 201 Created`.
    StatusLine(String),
    /// The parsed status code equals this value.
    StatusCode(u16),
    /// A header with this name is present.
    HeaderPresent(String),
    /// The body contains this text.
    BodyContains(String),
    /// Every inner expectation holds. Evaluated in order.
    All(Vec<Expectation>),
}

impl Expectation {
    pub fn status_line(text: &str) -> Self {
        Expectation::StatusLine(text.to_string())
    }

    pub fn status(code: u16) -> Self {
        Expectation::StatusCode(code)
    }

    pub fn header(name: &str) -> Self {
        Expectation::HeaderPresent(name.to_string())
    }

    pub fn body_contains(text: &str) -> Self {
        Expectation::BodyContains(text.to_string())
    }

    pub fn created() -> Self {
        Self::status_line("201 Created")
    }

    pub fn ok() -> Self {
        Self::status_line("200 OK")
    }

    pub fn forbidden() -> Self {
        Self::status_line("403 Forbidden")
    }

    /// Require `other` as well as `self`.
    pub fn and(self, other: Expectation) -> Self {
        match self {
            Expectation::All(mut all) => {
                all.push(other);
                Expectation::All(all)
            }
            first => Expectation::All(vec![first, other]),
        }
    }

    pub fn check(&self, response: &HttpResponse) -> Result<(), ExpectationFailure> {
        expect(response, self)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::StatusLine(text) => write!(f, "status line containing {text:?}"),
            Expectation::StatusCode(code) => write!(f, "status code {code}"),
            Expectation::HeaderPresent(name) => write!(f, "header {name:?}"),
            Expectation::BodyContains(text) => write!(f, "body containing {text:?}"),
            Expectation::All(all) => {
                for (i, e) in all.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
        }
    }
}

/// Evaluate `expectation` against `response`.
pub fn expect(response: &HttpResponse, expectation: &Expectation) -> Result<(), ExpectationFailure> {
    let holds = match expectation {
        Expectation::StatusLine(text) => response.status_line().contains(text.as_str()),
        Expectation::StatusCode(code) => response.status_code() == Some(*code),
        Expectation::HeaderPresent(name) => response.header(name).is_some(),
        Expectation::BodyContains(text) => find(response.body(), text.as_bytes()).is_some(),
        Expectation::All(all) => {
            return all.iter().try_for_each(|e| expect(response, e));
        }
    };

    if holds {
        return Ok(());
    }
    Err(ExpectationFailure {
        expected: expectation.to_string(),
        actual_excerpt: excerpt(response, expectation),
    })
}

fn excerpt(response: &HttpResponse, expectation: &Expectation) -> String {
    match expectation {
        Expectation::BodyContains(_) => {
            let body = response.body_text();
            let mut out: String = body.chars().take(EXCERPT_CHARS).collect();
            if body.chars().nth(EXCERPT_CHARS).is_some() {
                out.push_str("...");
            }
            out
        }
        _ => response.status_line().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(raw: &str) -> HttpResponse {
        HttpResponse::from_bytes(raw.as_bytes().to_vec(), false)
    }

    fn listing() -> HttpResponse {
        response(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 31\r\n\r\n{\"messages\": [\"alice: hello\"]}\n",
        )
    }

    #[test]
    fn status_line_substring_matches() {
        let resp = response("HTTP/1.1 201 Created\r\ncontent-length: 0\r\n\r\n");
        assert!(expect(&resp, &Expectation::created()).is_ok());
        assert!(expect(&resp, &Expectation::status_line("HTTP/1.1 201 Created")).is_ok());
        assert!(expect(&resp, &Expectation::status(201)).is_ok());
    }

    #[test]
    fn status_mismatch_reports_status_line() {
        let resp = response("HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\n\r\n");
        let err = expect(&resp, &Expectation::created()).unwrap_err();
        assert_eq!(err.expected, "status line containing \"201 Created\"");
        assert_eq!(err.actual_excerpt, "HTTP/1.1 403 Forbidden");
    }

    #[test]
    fn body_substring_only_searches_body() {
        let resp = listing();
        assert!(expect(&resp, &Expectation::body_contains("hello")).is_ok());
        assert!(expect(&resp, &Expectation::body_contains("application/json")).is_err());
    }

    #[test]
    fn body_failure_quotes_body() {
        let resp = listing();
        let err = expect(&resp, &Expectation::body_contains("goodbye")).unwrap_err();
        assert!(err.actual_excerpt.starts_with("{\"messages\""));
    }

    #[test]
    fn long_body_excerpt_is_bounded() {
        let body = "x".repeat(500);
        let resp = response(&format!("HTTP/1.1 200 OK\r\ncontent-length: 500\r\n\r\n{body}"));
        let err = expect(&resp, &Expectation::body_contains("y")).unwrap_err();
        assert_eq!(err.actual_excerpt.len(), EXCERPT_CHARS + 3);
        assert!(err.actual_excerpt.ends_with("..."));
    }

    #[test]
    fn header_presence() {
        let resp = listing();
        assert!(expect(&resp, &Expectation::header("Content-Type")).is_ok());
        assert!(expect(&resp, &Expectation::header("Set-Cookie")).is_err());
    }

    #[test]
    fn conjunction_stops_at_first_failure() {
        let resp = listing();
        let expectation = Expectation::ok()
            .and(Expectation::body_contains("nope"))
            .and(Expectation::header("missing"));
        let err = expect(&resp, &expectation).unwrap_err();
        assert_eq!(err.expected, "body containing \"nope\"");
    }

    #[test]
    fn conjunction_display_joins_parts() {
        let expectation = Expectation::ok().and(Expectation::body_contains("hi"));
        assert_eq!(
            expectation.to_string(),
            "status line containing \"200 OK\" and body containing \"hi\""
        );
    }

    #[test]
    fn empty_response_fails_every_status_check() {
        let resp = HttpResponse::from_bytes(Vec::new(), false);
        assert!(expect(&resp, &Expectation::ok()).is_err());
        assert!(expect(&resp, &Expectation::status(200)).is_err());
        assert!(expect(&resp, &Expectation::body_contains("a")).is_err());
    }
}
