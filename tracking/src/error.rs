use std::{error::Error, fmt, io};

/// The result type used in the entire tracking module.
pub type Result<T> = std::result::Result<T, TrackingErr>;

/// Everything that can go wrong while talking to a tracking store.
#[derive(Debug)]
pub enum TrackingErr {
    Io(io::Error),
    Yaml(serde_yaml::Error),
    Http(reqwest::Error),
    /// The tracking server answered with an error.
    Api {
        status: u16,
        code: String,
        message: String,
    },
    InvalidKey(String),
    /// A parameter was logged twice with different values.
    ParamConflict {
        key: String,
        old: String,
        new: String,
    },
    UnknownRun(String),
    UnknownExperiment(String),
    /// The run was already ended.
    RunNotActive(String),
}

impl fmt::Display for TrackingErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingErr::Io(e) => write!(f, "io error: {e}"),
            TrackingErr::Yaml(e) => write!(f, "invalid metadata file: {e}"),
            TrackingErr::Http(e) => write!(f, "http error: {e}"),
            TrackingErr::Api {
                status,
                code,
                message,
            } => write!(f, "tracking server error {status} ({code}): {message}"),
            TrackingErr::InvalidKey(key) => write!(f, "invalid param or metric key: {key:?}"),
            TrackingErr::ParamConflict { key, old, new } => write!(
                f,
                "param {key:?} was already logged with value {old:?}, cannot change it to {new:?}"
            ),
            TrackingErr::UnknownRun(id) => write!(f, "no run with id {id}"),
            TrackingErr::UnknownExperiment(id) => write!(f, "no experiment with id {id}"),
            TrackingErr::RunNotActive(id) => write!(f, "run {id} is not active"),
        }
    }
}

impl Error for TrackingErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrackingErr::Io(e) => Some(e),
            TrackingErr::Yaml(e) => Some(e),
            TrackingErr::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrackingErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yaml::Error> for TrackingErr {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

impl From<reqwest::Error> for TrackingErr {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
