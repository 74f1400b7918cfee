use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use orchestrator::{
    configs::{DEFAULT_CONFIG_PATH, TrainConfig},
    run_training,
};
use tracking::Tracker;

/// Trains the model and records the run in the configured tracking store.
#[derive(Parser, Debug)]
#[command(name = "train", version, about)]
struct Args {
    /// The YAML configuration to start from.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// `key.path=value` overrides, applied in order. Prefix a key with `+` to add it.
    overrides: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = TrainConfig::load(&args.config, &args.overrides)
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!("seed {}, {} epoch(s) at lr {}", cfg.seed, cfg.model.epochs, cfg.model.lr);

    let tracker = Tracker::from_env().context("opening the tracking store")?;
    run_training(&cfg, &tracker)?;

    Ok(())
}
