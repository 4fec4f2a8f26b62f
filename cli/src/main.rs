mod args;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use probe_core::Probe;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())))
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let identity = args.identity()?;
    let probe = Probe::new(args.target()?, args.config());
    let scenario = args.scenario(&identity);
    info!(server = %probe.target(), steps = scenario.steps().len(), "starting probe");

    let reports = scenario
        .run(&probe, |step, response| {
            println!("{} response:\n{}\n", step.name, response.text());
            if response.is_truncated() {
                warn!(step = %step.name, bytes = response.len(), "response was cut off at the capture limit");
            }
        })
        .with_context(|| format!("probe against {} failed", probe.target()))?;

    info!(steps = reports.len(), "all expectations met");
    Ok(())
}
