mod overrides;
mod training;

use std::{error::Error, fmt, io};

pub use overrides::apply_override;
pub use training::{DataConfig, MlflowConfig, ModelConfig, TrainConfig};

/// The default location of the training configuration.
pub const DEFAULT_CONFIG_PATH: &str = "conf/train.yaml";

/// Errors raised while loading a configuration.
#[derive(Debug)]
pub enum ConfigErr {
    Io(io::Error),
    /// The document isn't valid YAML or doesn't have the expected shape.
    Parse(serde_yaml::Error),
    /// A command line override couldn't be applied.
    Override { arg: String, reason: String },
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(e) => write!(f, "invalid config: {e}"),
            Self::Override { arg, reason } => write!(f, "invalid override {arg:?}: {reason}"),
        }
    }
}

impl Error for ConfigErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Override { .. } => None,
        }
    }
}

impl From<io::Error> for ConfigErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigErr {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e)
    }
}
