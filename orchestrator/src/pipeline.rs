use log::info;
use machine_learning::{arch::build_model, dataset::load_data, seed::Seeds, training::train_model};
use tracking::{ActiveRun, Tracker};

use crate::{configs::TrainConfig, error::Result};

/// The metric the final training loss is recorded under.
pub const FINAL_LOSS_METRIC: &str = "final_loss";

/// Loads the data, builds the model and trains it, all drawing from `seeds`.
///
/// # Returns
/// The loss after the last epoch.
pub fn train(cfg: &TrainConfig, seeds: &mut Seeds) -> Result<f32> {
    let data = load_data(&cfg.data.path, seeds.array());
    let mut model = build_model(seeds.tensor())?;

    let loss = train_model(
        &mut model,
        data.x(),
        data.y_column(),
        cfg.model.lr,
        cfg.model.epochs,
    )?;

    Ok(loss)
}

/// Trains a model inside a tracked run of the configured experiment.
///
/// The run records the seed and the model hyperparameters as params and the last loss as
/// the `final_loss` metric. It ends as `FINISHED` on success and `FAILED` otherwise.
///
/// # Returns
/// The loss after the last epoch.
pub fn run_training(cfg: &TrainConfig, tracker: &Tracker) -> Result<f32> {
    let mut seeds = Seeds::new(cfg.seed);
    let experiment = tracker.set_experiment(&cfg.mlflow.experiment_name)?;

    let loss = tracker.with_run(&experiment, |run| -> Result<f32> {
        log_config(run, cfg)?;

        let loss = train(cfg, &mut seeds)?;
        run.log_metric(FINAL_LOSS_METRIC, loss as f64, 0)?;
        Ok(loss)
    })?;

    info!("training complete, final loss {loss:.4}");
    println!("Training complete. Final loss: {loss:.4}");
    Ok(loss)
}

fn log_config(run: &mut ActiveRun<'_>, cfg: &TrainConfig) -> Result<()> {
    run.log_params(&[
        ("seed", cfg.seed.to_string()),
        ("lr", cfg.model.lr.to_string()),
        ("epochs", cfg.model.epochs.to_string()),
        ("batch_size", cfg.model.batch_size.to_string()),
    ])?;

    Ok(())
}
