use std::time::Duration;

use clap::{Parser, ValueEnum};
use probe_core::{Identity, ProbeConfig, ProbeError, Scenario, Target};

/// Smoke-test the /api/messages endpoints of a message-board server.
#[derive(Debug, Parser)]
#[command(name = "probe", version)]
pub struct Args {
    /// Host of the server under test.
    pub host: String,

    pub port: u16,

    /// Sent as the `nickname` cookie.
    pub username: String,

    /// Text to post and then look for.
    pub message: String,

    #[arg(long, value_enum, default_value_t = Sequence::PostGet)]
    pub sequence: Sequence,

    /// Also send anonymous POST and GET requests and require this status.
    #[arg(long, value_name = "CODE", env = "PROBE_ANONYMOUS_STATUS")]
    pub anonymous_status: Option<u16>,

    /// Log in through /api/login before the first step.
    #[arg(long)]
    pub login: bool,

    /// Bytes captured per response before it is cut off as truncated.
    #[arg(long, env = "PROBE_MAX_RESPONSE_BYTES", default_value_t = ProbeConfig::default().max_response_bytes)]
    pub max_response_bytes: usize,

    /// Give up on a silent server after this many milliseconds.
    #[arg(long, value_name = "MS", env = "PROBE_READ_TIMEOUT_MS")]
    pub read_timeout_ms: Option<u64>,

    #[arg(long, value_name = "MS", env = "PROBE_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: Option<u64>,

    /// More output per occurrence (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sequence {
    /// POST, then GET.
    PostGet,
    /// GET, POST, then GET.
    GetPostGet,
}

impl Args {
    pub fn target(&self) -> Result<Target, ProbeError> {
        Target::new(&self.host, self.port)
    }

    pub fn identity(&self) -> Result<Identity, ProbeError> {
        Identity::new(&self.username)
    }

    pub fn config(&self) -> ProbeConfig {
        ProbeConfig {
            max_response_bytes: self.max_response_bytes,
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            read_timeout: self.read_timeout_ms.map(Duration::from_millis),
            ..ProbeConfig::default()
        }
    }

    pub fn scenario(&self, identity: &Identity) -> Scenario {
        let mut scenario = match self.sequence {
            Sequence::PostGet => Scenario::post_then_get(identity, &self.message),
            Sequence::GetPostGet => Scenario::get_post_get(identity, &self.message),
        };
        if self.login {
            scenario = scenario.with_login(identity);
        }
        if let Some(status) = self.anonymous_status {
            scenario = scenario.with_anonymous_checks(&self.message, status);
        }
        scenario
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("probe").chain(argv.iter().copied())).unwrap()
    }

    fn step_names(args: &Args) -> Vec<String> {
        let identity = args.identity().unwrap();
        args.scenario(&identity)
            .steps()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    #[test]
    fn positional_arguments() {
        let args = parse(&["localhost", "8548", "alice", "hello world"]);
        assert_eq!(args.target().unwrap().to_string(), "localhost:8548");
        assert_eq!(args.identity().unwrap().as_str(), "alice");
        assert_eq!(args.message, "hello world");
        assert_eq!(args.sequence, Sequence::PostGet);
        assert_eq!(args.log_filter(), "warn");
    }

    #[test]
    fn missing_arguments_are_a_usage_error() {
        let err = Args::try_parse_from(["probe", "localhost", "8548", "alice"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn port_must_be_numeric() {
        let err = Args::try_parse_from(["probe", "localhost", "http", "alice", "hi"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn default_scenario_is_post_then_get() {
        let args = parse(&["h", "1", "alice", "hi"]);
        assert_eq!(step_names(&args), vec!["POST", "GET"]);
    }

    #[test]
    fn options_shape_the_scenario() {
        let args = parse(&[
            "h",
            "1",
            "alice",
            "hi",
            "--sequence",
            "get-post-get",
            "--login",
            "--anonymous-status",
            "403",
        ]);
        assert_eq!(
            step_names(&args),
            vec!["LOGIN", "GET", "POST", "GET", "ANONYMOUS POST", "ANONYMOUS GET"]
        );
    }

    #[test]
    fn limits_map_onto_config() {
        let args = parse(&[
            "h",
            "1",
            "alice",
            "hi",
            "--max-response-bytes",
            "4096",
            "--read-timeout-ms",
            "250",
            "-vv",
        ]);
        let config = args.config();
        assert_eq!(config.max_response_bytes, 4096);
        assert_eq!(config.read_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.connect_timeout, None);
        assert_eq!(args.log_filter(), "debug");
    }

    #[test]
    fn cookie_breaking_username_is_rejected() {
        let args = parse(&["h", "1", "a;b", "hi"]);
        assert!(matches!(args.identity(), Err(ProbeError::InvalidArgument(_))));
    }
}
