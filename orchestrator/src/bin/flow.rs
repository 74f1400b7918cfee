use anyhow::Result;
use log::info;

use orchestrator::flow::training_pipeline;

fn main() -> Result<()> {
    env_logger::init();

    let metrics = training_pipeline()?;
    info!("flow returned {metrics}");

    Ok(())
}
