use std::fmt;

use machine_learning::MlErr;
use tracking::TrackingErr;

use crate::{configs::ConfigErr, dag::DagErr};

/// The result type used in the entire orchestrator.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// The configuration couldn't be loaded.
    Config(ConfigErr),
    /// Building or training the model failed.
    Ml(MlErr),
    /// The tracking store rejected a request.
    Tracking(TrackingErr),
    /// The flow's task graph is malformed or one of its tasks failed.
    Dag(DagErr),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::Ml(e) => write!(f, "training error: {e}"),
            Self::Tracking(e) => write!(f, "tracking error: {e}"),
            Self::Dag(e) => write!(f, "flow error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::Tracking(e) => Some(e),
            Self::Dag(e) => Some(e),
        }
    }
}

impl From<ConfigErr> for OrchestratorError {
    fn from(e: ConfigErr) -> Self {
        Self::Config(e)
    }
}

impl From<MlErr> for OrchestratorError {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<TrackingErr> for OrchestratorError {
    fn from(e: TrackingErr) -> Self {
        Self::Tracking(e)
    }
}

impl From<DagErr> for OrchestratorError {
    fn from(e: DagErr) -> Self {
        Self::Dag(e)
    }
}
