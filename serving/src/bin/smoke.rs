use std::{process::ExitCode, time::Duration};

use anyhow::Result;
use clap::Parser;

use serving::{SmokeClient, SmokeSuite, any_failed, serving_url_from_env};

/// Runs the smoke checks against a serving endpoint.
#[derive(Parser, Debug)]
#[command(name = "smoke", version, about)]
struct Args {
    /// The endpoint's base url, `$SERVING_URL` or http://localhost:8080 when not given.
    #[arg(long)]
    url: Option<String>,

    /// Per request timeout, in seconds.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    let url = args.url.unwrap_or_else(serving_url_from_env);
    let client = SmokeClient::new(&url, Duration::from_secs(args.timeout_secs))?;
    let reports = SmokeSuite::new(client).run();

    for report in &reports {
        println!("{report}");
    }

    if any_failed(&reports) {
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
