//! Scripted smoke sequences built from single exchanges.
//!
//! A `Scenario` is an ordered list of steps, each pairing an action with the
//! expectation its response must meet. Every step opens its own connection.
//! `run` hands each raw response to an observer before evaluating it, so a
//! failing step can always be diagnosed from what the observer printed.

use tracing::{info, info_span};

use crate::error::{ExpectationFailure, ProbeError};
use crate::expect::Expectation;
use crate::http::{HttpRequest, HttpResponse};
use crate::probe::Probe;
use crate::types::{Identity, NICKNAME_COOKIE};

/// Status the reference server answers anonymous requests with.
pub const DEFAULT_ANONYMOUS_STATUS: u16 = 403;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login { nickname: String },
    Send { identity: Option<Identity>, message: String },
    Fetch { identity: Option<Identity> },
    Logout { identity: Option<Identity> },
}

impl Action {
    pub fn request(&self, probe: &Probe) -> Result<HttpRequest, ProbeError> {
        match self {
            Action::Login { nickname } => probe.build_login(nickname),
            Action::Send { identity, message } => Ok(probe.build_send_message(identity.as_ref(), message)),
            Action::Fetch { identity } => Ok(probe.build_fetch_messages(identity.as_ref())),
            Action::Logout { identity } => Ok(probe.build_logout(identity.as_ref())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub action: Action,
    pub expectation: Expectation,
}

/// Outcome of one passing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub status_line: String,
    pub bytes: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, name: &str, action: Action, expectation: Expectation) -> Self {
        self.steps.push(Step {
            name: name.to_string(),
            action,
            expectation,
        });
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// POST the message, then GET and look for it.
    pub fn post_then_get(identity: &Identity, message: &str) -> Self {
        Self::new()
            .step("POST", send(Some(identity), message), Expectation::created())
            .step("GET", fetch(Some(identity)), listing_with(message))
    }

    /// GET once before posting, then POST and GET again.
    pub fn get_post_get(identity: &Identity, message: &str) -> Self {
        Self::new()
            .step("GET", fetch(Some(identity)), Expectation::ok())
            .step("POST", send(Some(identity), message), Expectation::created())
            .step("GET", fetch(Some(identity)), listing_with(message))
    }

    /// Append a POST and a GET without an identity, both expected to answer
    /// with `status`.
    pub fn with_anonymous_checks(self, message: &str, status: u16) -> Self {
        self.step("ANONYMOUS POST", send(None, message), Expectation::status(status))
            .step("ANONYMOUS GET", fetch(None), Expectation::status(status))
    }

    /// Run a login for `identity` before every other step.
    pub fn with_login(mut self, identity: &Identity) -> Self {
        self.steps.insert(
            0,
            Step {
                name: "LOGIN".to_string(),
                action: Action::Login {
                    nickname: identity.as_str().to_string(),
                },
                expectation: Expectation::ok().and(Expectation::header("Set-Cookie")),
            },
        );
        self
    }

    /// Execute the steps in order, stopping at the first failure.
    pub fn run<F>(&self, probe: &Probe, mut observer: F) -> Result<Vec<StepReport>, ProbeError>
    where
        F: FnMut(&Step, &HttpResponse),
    {
        let mut reports = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let _span = info_span!("step", step = %step.name).entered();

            let request = step.action.request(probe)?;
            let response = probe.exchange(&request)?;
            observer(step, &response);

            step.expectation.check(&response)?;
            if let Action::Login { nickname } = &step.action {
                check_login_cookie(&response, nickname)?;
            }

            info!(status = %response.status_line(), bytes = response.len(), "step passed");
            reports.push(StepReport {
                name: step.name.clone(),
                status_line: response.status_line().into_owned(),
                bytes: response.len(),
                truncated: response.is_truncated(),
            });
        }
        Ok(reports)
    }
}

fn send(identity: Option<&Identity>, message: &str) -> Action {
    Action::Send {
        identity: identity.cloned(),
        message: message.to_string(),
    }
}

fn fetch(identity: Option<&Identity>) -> Action {
    Action::Fetch {
        identity: identity.cloned(),
    }
}

fn listing_with(message: &str) -> Expectation {
    Expectation::ok().and(Expectation::body_contains(message))
}

fn check_login_cookie(response: &HttpResponse, nickname: &str) -> Result<(), ProbeError> {
    match response.cookie(NICKNAME_COOKIE) {
        Some(value) if value == nickname => Ok(()),
        other => Err(ExpectationFailure {
            expected: format!("{NICKNAME_COOKIE} cookie set to {nickname:?}"),
            actual_excerpt: other.unwrap_or_default().to_string(),
        }
        .into()),
    }
}
