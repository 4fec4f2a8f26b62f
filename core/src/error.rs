//! Error types for the message-board probe.
//!
//! # Design
//! Network setup failures are split into `Resolution` and `Connection` so a
//! caller can tell "the name does not exist" from "nothing is listening."
//! Everything that goes wrong after the stream is open lands in `Transport`
//! with the exchange stage that failed. A response that arrived but did not
//! match is an `Expectation` failure, which carries its own excerpt of what
//! was actually received.
//!
//! None of these are retried inside the crate. Whether a failure aborts the
//! run is the caller's decision.

use std::io;

use thiserror::Error;

/// Errors returned by connection setup, exchanges, and scenario runs.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A target or identity value cannot be put on the wire as given.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The host did not resolve to any IPv4 stream address.
    #[error("failed to resolve {host}:{port}: {reason}")]
    Resolution {
        host: String,
        port: u16,
        reason: String,
    },

    /// Every resolved address refused or timed out.
    #[error("failed to connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: io::Error,
    },

    /// The stream failed while writing the request or reading the response.
    #[error("transport error while {stage}: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    /// The response was received but did not satisfy an expectation.
    #[error(transparent)]
    Expectation(#[from] ExpectationFailure),
}

/// A response that did not match what the caller required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {actual_excerpt:?}")]
pub struct ExpectationFailure {
    pub expected: String,
    pub actual_excerpt: String,
}
