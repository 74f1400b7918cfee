use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{Result, Tracker, tracker::now_millis};

/// The lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Scheduled,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    /// The numeric code used in on-disk metadata.
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Running => 1,
            RunStatus::Scheduled => 2,
            RunStatus::Finished => 3,
            RunStatus::Failed => 4,
            RunStatus::Killed => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            1 => RunStatus::Running,
            2 => RunStatus::Scheduled,
            3 => RunStatus::Finished,
            4 => RunStatus::Failed,
            5 => RunStatus::Killed,
            _ => return None,
        };

        Some(status)
    }

    pub fn is_terminated(self) -> bool {
        matches!(
            self,
            RunStatus::Finished | RunStatus::Failed | RunStatus::Killed
        )
    }
}

/// A single measurement of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    #[serde(with = "json_float")]
    pub value: f64,
    pub timestamp: i64,
    pub step: i64,
}

/// JSON has no literal for non finite numbers, tracking servers spell them as strings.
pub(crate) mod json_float {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else if value.is_infinite() {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                _ => Err(D::Error::custom(format!("not a number: {text:?}"))),
            },
        }
    }
}

/// The identity and lifecycle of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: String,
    pub status: RunStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

/// Everything recorded about a run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub info: RunInfo,
    pub params: BTreeMap<String, String>,
    /// The full history of every metric, in logging order.
    pub metrics: BTreeMap<String, Vec<Metric>>,
}

impl RunRecord {
    /// Returns the last value logged for `key`.
    pub fn latest_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key)?.last().map(|m| m.value)
    }
}

/// A run that's currently being recorded.
///
/// The run must be closed with `end`. If it's dropped while still open, for example while
/// unwinding from a panic, it ends itself as `FAILED`.
pub struct ActiveRun<'t> {
    tracker: &'t Tracker,
    run_id: String,
    experiment_id: String,
    ended: bool,
}

impl<'t> ActiveRun<'t> {
    pub(crate) fn new(tracker: &'t Tracker, run_id: String, experiment_id: String) -> Self {
        Self {
            tracker,
            run_id,
            experiment_id,
            ended: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.run_id
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Logs a single parameter. Parameters are immutable once logged.
    pub fn log_param(&mut self, key: &str, value: impl ToString) -> Result<()> {
        self.tracker
            .store()
            .log_param(&self.run_id, key, &value.to_string())
    }

    /// Logs a batch of parameters, stopping at the first failure.
    pub fn log_params<K, V>(&mut self, params: &[(K, V)]) -> Result<()>
    where
        K: AsRef<str>,
        V: ToString,
    {
        for (key, value) in params {
            self.log_param(key.as_ref(), value.to_string())?;
        }

        Ok(())
    }

    /// Logs a metric measurement at the given step.
    pub fn log_metric(&mut self, key: &str, value: f64, step: i64) -> Result<()> {
        let metric = Metric {
            key: key.to_string(),
            value,
            timestamp: now_millis(),
            step,
        };

        self.tracker.store().log_metric(&self.run_id, &metric)
    }

    /// Ends the run with the given terminal status.
    pub fn end(mut self, status: RunStatus) -> Result<()> {
        self.ended = true;
        self.close(status)
    }

    fn close(&self, status: RunStatus) -> Result<()> {
        self.tracker
            .store()
            .end_run(&self.run_id, status, now_millis())?;

        info!("run {} ended as {status:?}", self.run_id);
        Ok(())
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }

        if let Err(e) = self.close(RunStatus::Failed) {
            warn!("failed to close run {}: {e}", self.run_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for status in [
            RunStatus::Running,
            RunStatus::Scheduled,
            RunStatus::Finished,
            RunStatus::Failed,
            RunStatus::Killed,
        ] {
            assert_eq!(RunStatus::from_code(status.code()), Some(status));
        }

        assert_eq!(RunStatus::from_code(0), None);
    }

    #[test]
    fn terminated() {
        assert!(!RunStatus::Running.is_terminated());
        assert!(RunStatus::Finished.is_terminated());
        assert!(RunStatus::Failed.is_terminated());
    }

    #[test]
    fn non_finite_metric_values_are_strings() {
        let metric = |value| Metric {
            key: "loss".to_string(),
            value,
            timestamp: 1,
            step: 0,
        };

        let nan = serde_json::to_value(metric(f64::NAN)).unwrap();
        let inf = serde_json::to_value(metric(f64::INFINITY)).unwrap();
        let neg_inf = serde_json::to_value(metric(f64::NEG_INFINITY)).unwrap();
        let finite = serde_json::to_value(metric(0.5)).unwrap();

        assert_eq!(nan["value"], "NaN");
        assert_eq!(inf["value"], "Infinity");
        assert_eq!(neg_inf["value"], "-Infinity");
        assert_eq!(finite["value"], 0.5);
    }

    #[test]
    fn metric_values_read_back_from_strings() {
        let raw = r#"[
            {"key": "loss", "value": "NaN", "timestamp": 1, "step": 0},
            {"key": "loss", "value": "-Infinity", "timestamp": 2, "step": 1},
            {"key": "loss", "value": 0.25, "timestamp": 3, "step": 2}
        ]"#;

        let history: Vec<Metric> = serde_json::from_str(raw).unwrap();

        assert!(history[0].value.is_nan());
        assert_eq!(history[1].value, f64::NEG_INFINITY);
        assert_eq!(history[2].value, 0.25);

        let bad = r#"{"key": "loss", "value": "high", "timestamp": 1, "step": 0}"#;
        assert!(serde_json::from_str::<Metric>(bad).is_err());
    }

    #[test]
    fn status_serializes_like_the_rest_api() {
        let json = serde_json::to_string(&RunStatus::Finished).unwrap();
        assert_eq!(json, "\"FINISHED\"");
    }
}
