//! Smoke-test probe for a message-board HTTP API.
//!
//! # Overview
//! Opens one TCP connection per exchange, writes a hand-built HTTP/1.1
//! request to `/api/messages` (or `/api/login`), captures one bounded
//! response, and checks it against an `Expectation`.
//!
//! # Design
//! - `Probe` is stateless: it holds only the `Target` and `ProbeConfig`.
//! - Each operation is split into `build_*` (pure, produces an
//!   `HttpRequest`) and an I/O call that consumes a `Connection`, so a
//!   socket can never carry more than one request.
//! - Nothing here exits the process. Every failure is a `ProbeError` and the
//!   caller decides whether it is fatal.
//! - `Scenario` strings exchanges together into the canonical smoke runs.

pub mod connection;
pub mod error;
pub mod expect;
pub mod http;
pub mod probe;
pub mod scenario;
pub mod types;

pub use connection::{connect, Connection};
pub use error::{ExpectationFailure, ProbeError};
pub use expect::{expect, Expectation};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseHead};
pub use probe::{Probe, LOGIN_PATH, MESSAGES_PATH};
pub use scenario::{Action, Scenario, Step, StepReport, DEFAULT_ANONYMOUS_STATUS};
pub use types::{Identity, ProbeConfig, Target, NICKNAME_COOKIE};
