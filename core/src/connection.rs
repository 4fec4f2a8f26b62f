//! One TCP connection, good for exactly one exchange.
//!
//! # Design
//! `connect` resolves the target to IPv4 stream addresses only and returns a
//! `Connection` that owns the socket. `Connection::exchange` consumes
//! `self`, so a connection cannot be reused for a second request and the
//! socket is closed on every exit path when the value drops.
//!
//! The response is read in `chunk_size` pieces until the head is complete
//! and the declared `Content-Length` is satisfied, the status forbids a
//! body, the peer half-closes, or `max_response_bytes` is reached. Hitting
//! the bound cuts the capture there and flags it as truncated rather than
//! reading further.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::http::{find, is_bodiless_status, HttpRequest, HttpResponse, ResponseHead};
use crate::types::{ProbeConfig, Target};

/// An open stream to the target, consumed by a single exchange.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    max_response_bytes: usize,
    chunk_size: usize,
}

/// Resolve `target` to IPv4 addresses and open a stream to the first one
/// that accepts.
pub fn connect(target: &Target, config: &ProbeConfig) -> Result<Connection, ProbeError> {
    let addrs = resolve_ipv4(target)?;

    let mut last_err = None;
    for addr in addrs {
        debug!(%target, %addr, "connecting");
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream
                    .set_read_timeout(config.read_timeout)
                    .map_err(|source| ProbeError::Connection {
                        target: target.to_string(),
                        source,
                    })?;
                return Ok(Connection {
                    stream,
                    peer: addr,
                    max_response_bytes: config.max_response_bytes,
                    chunk_size: config.chunk_size.max(1),
                });
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(ProbeError::Connection {
        target: target.to_string(),
        source: last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address to connect to")),
    })
}

fn resolve_ipv4(target: &Target) -> Result<Vec<SocketAddr>, ProbeError> {
    let resolution_error = |reason: String| ProbeError::Resolution {
        host: target.host().to_string(),
        port: target.port(),
        reason,
    };

    let addrs: Vec<SocketAddr> = (target.host(), target.port())
        .to_socket_addrs()
        .map_err(|e| resolution_error(e.to_string()))?
        .filter(SocketAddr::is_ipv4)
        .collect();

    if addrs.is_empty() {
        return Err(resolution_error("no IPv4 address".to_string()));
    }
    Ok(addrs)
}

impl Connection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Write `request`, capture one response, then close the socket.
    pub fn exchange(mut self, request: &HttpRequest) -> Result<HttpResponse, ProbeError> {
        let wire = request.to_wire();
        debug!(peer = %self.peer, method = %request.method, path = %request.path, bytes = wire.len(), "sending request");

        self.stream
            .write_all(wire.as_bytes())
            .and_then(|()| self.stream.flush())
            .map_err(|source| ProbeError::Transport {
                stage: "writing request",
                source,
            })?;

        let response = self.read_response()?;
        debug!(peer = %self.peer, bytes = response.len(), truncated = response.is_truncated(), "response captured");

        // The peer may already be gone; closing is best effort.
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(response)
    }

    fn read_response(&mut self) -> Result<HttpResponse, ProbeError> {
        let mut captured: Vec<u8> = Vec::with_capacity(self.chunk_size);
        let mut chunk = vec![0_u8; self.chunk_size];

        loop {
            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ProbeError::Transport {
                        stage: "reading response",
                        source,
                    })
                }
            };
            if n == 0 {
                debug!(bytes = captured.len(), "peer closed the connection");
                return Ok(HttpResponse::from_bytes(captured, false));
            }

            let room = self.max_response_bytes - captured.len();
            if n > room {
                captured.extend_from_slice(&chunk[..room]);
                warn!(limit = self.max_response_bytes, "response exceeds capture limit, truncating");
                return Ok(HttpResponse::from_bytes(captured, true));
            }
            captured.extend_from_slice(&chunk[..n]);

            if is_complete(&captured) {
                return Ok(HttpResponse::from_bytes(captured, false));
            }
            if captured.len() == self.max_response_bytes {
                warn!(limit = self.max_response_bytes, "response reached capture limit, truncating");
                return Ok(HttpResponse::from_bytes(captured, true));
            }
        }
    }
}

/// Whether `captured` holds a whole response according to its own head.
///
/// Without a `Content-Length` the end of the response is only known at EOF.
fn is_complete(captured: &[u8]) -> bool {
    let (head_len, code, content_length) = match ResponseHead::parse(captured) {
        Some(head) => (head.len, Some(head.code), head.content_length()),
        None => match scan_head(captured) {
            Some(scanned) => scanned,
            None => return false,
        },
    };
    if code.is_some_and(is_bodiless_status) {
        return true;
    }
    match content_length {
        Some(len) => captured.len() - head_len >= len,
        None => false,
    }
}

/// Line-based fallback for a terminated head `httparse` rejects, such as
/// one with more headers than it is given room for.
///
/// Yields the head length, the status code and the declared
/// `Content-Length`, so framing still works without a full parse.
fn scan_head(captured: &[u8]) -> Option<(usize, Option<u16>, Option<usize>)> {
    let end = find(captured, b"\r\n\r\n")?;
    let head = String::from_utf8_lossy(&captured[..end]);
    let mut lines = head.split("\r\n");

    let code = lines
        .next()
        .and_then(|status| status.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok());
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok());

    Some((end + 4, code, content_length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_when_content_length_satisfied() {
        assert!(is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi"));
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhi"));
    }

    #[test]
    fn incomplete_without_length_or_head() {
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\n\r\nstreaming"));
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\nContent-Le"));
    }

    #[test]
    fn complete_for_bodiless_status() {
        assert!(is_complete(b"HTTP/1.1 204 No Content\r\n\r\n"));
    }

    fn crowded_head(extra_headers: usize, content_length: usize) -> Vec<u8> {
        let mut raw = String::from("HTTP/1.1 200 OK\r\n");
        for i in 0..extra_headers {
            raw.push_str(&format!("X-Filler-{i}: {i}\r\n"));
        }
        raw.push_str(&format!("Content-Length: {content_length}\r\n\r\n"));
        raw.into_bytes()
    }

    #[test]
    fn complete_when_headers_overflow_parser() {
        let mut raw = crowded_head(100, 2);
        assert!(ResponseHead::parse(&raw).is_none());
        assert!(!is_complete(&raw));
        raw.extend_from_slice(b"ok");
        assert!(is_complete(&raw));
    }

    #[test]
    fn scan_head_reads_status_and_length() {
        let raw = crowded_head(70, 5);
        assert_eq!(scan_head(&raw), Some((raw.len(), Some(200), Some(5))));
        assert_eq!(scan_head(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n"), None);
    }

    #[test]
    fn resolve_localhost_yields_ipv4_only() {
        let target = Target::new("localhost", 8548).unwrap();
        let addrs = resolve_ipv4(&target).unwrap();
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(SocketAddr::is_ipv4));
    }

    #[test]
    fn ipv6_literal_has_no_ipv4_address() {
        let target = Target::new("::1", 8548).unwrap();
        let err = resolve_ipv4(&target).unwrap_err();
        assert!(matches!(err, ProbeError::Resolution { .. }));
    }
}
