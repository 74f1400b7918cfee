//! Experiment tracking: experiments, scoped runs and the stores that persist them.
//!
//! The on-disk layout of [`FileStore`] and the requests issued by [`RestStore`] follow
//! MLflow's, so runs recorded here can be browsed with MLflow's own tools.

mod error;
mod run;
pub mod store;
mod tracker;
mod uri;

pub use error::{Result, TrackingErr};
pub use run::{ActiveRun, Metric, RunInfo, RunRecord, RunStatus};
pub use store::{FileStore, RestStore, TrackingStore};
pub use tracker::{Experiment, Tracker};
pub use uri::{S3_ENDPOINT_ENV, TRACKING_URI_ENV, TrackingUri};
