mod file;
mod rest;

pub use file::FileStore;
pub use rest::RestStore;

use crate::{Metric, Result, RunRecord, RunStatus, TrackingErr};

/// A backend that persists experiments and runs.
pub trait TrackingStore {
    /// Looks an experiment up by name.
    ///
    /// # Returns
    /// The experiment's id, or `None` if there's no experiment with that name.
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<String>>;

    /// Creates a new experiment and returns its id.
    fn create_experiment(&self, name: &str) -> Result<String>;

    /// Creates a new run in the `RUNNING` state and returns its id.
    ///
    /// # Arguments
    /// * `experiment_id` - The experiment the run belongs to.
    /// * `run_name` - A human readable name for the run.
    /// * `start_time` - Milliseconds since the unix epoch.
    fn create_run(&self, experiment_id: &str, run_name: &str, start_time: i64) -> Result<String>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()>;

    /// Moves the run to a terminal status.
    fn end_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()>;

    /// Reads back everything recorded about a run.
    fn get_run(&self, run_id: &str) -> Result<RunRecord>;
}

/// Checks a param or metric key: alphanumerics, `_`, `-`, `.`, ` ` and `/`, without
/// escaping upwards through `..` or starting at the root.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '/');

    let valid = !key.is_empty()
        && key.chars().all(allowed)
        && !key.starts_with('/')
        && !key.split('/').any(|part| part == ".." || part == ".");

    if !valid {
        return Err(TrackingErr::InvalidKey(key.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_keys() {
        for key in ["lr", "final_loss", "model.lr", "train/loss", "batch size", "a-b"] {
            assert!(validate_key(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn invalid_keys() {
        for key in ["", "/etc", "../up", "a/../b", "a/./b", "semi;colon", "tab\t"] {
            assert!(validate_key(key).is_err(), "{key}");
        }
    }
}
