use std::{fs, path::Path};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::{ConfigErr, overrides::apply_override};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Where the dataset lives. The synthetic loader ignores it.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub lr: f32,
    pub epochs: usize,
    /// Logged with the run, training is always full batch.
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MlflowConfig {
    pub experiment_name: String,
}

/// The configuration of a training run. It's never mutated once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    pub seed: u64,
    pub data: DataConfig,
    pub model: ModelConfig,
    pub mlflow: MlflowConfig,
}

impl TrainConfig {
    /// Reads the configuration at `path` and applies the `key.path=value` overrides in order.
    ///
    /// # Errors
    /// Returns a `ConfigErr` if the file can't be read, an override is malformed or names a
    /// key that doesn't exist, or the resulting document doesn't describe a `TrainConfig`.
    pub fn load<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self, ConfigErr> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let cfg = Self::from_yaml_str(&content, overrides)?;

        info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Parses a YAML document and applies the overrides in order.
    pub fn from_yaml_str(content: &str, overrides: &[String]) -> Result<Self, ConfigErr> {
        let mut doc: Value = serde_yaml::from_str(content)?;

        for raw in overrides {
            apply_override(&mut doc, raw)?;
            debug!("applied override {raw}");
        }

        Ok(serde_yaml::from_value(doc)?)
    }

    /// Renders the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigErr> {
        Ok(serde_yaml::to_string(self)?)
    }
}
