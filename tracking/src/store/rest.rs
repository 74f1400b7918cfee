use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned, de::IgnoredAny};
use serde_json::json;

use super::{TrackingStore, validate_key};
use crate::{Metric, Result, RunInfo, RunRecord, RunStatus, TrackingErr, run::json_float};

const API_PREFIX: &str = "api/2.0/mlflow";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const NOT_FOUND: &str = "RESOURCE_DOES_NOT_EXIST";

/// A tracking store that forwards everything to a tracking server over its REST api.
#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    client: Client,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ExperimentResponse {
    experiment: ExperimentBody,
}

#[derive(Deserialize)]
struct ExperimentBody {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct RunResponse {
    run: RunBody,
}

#[derive(Deserialize)]
struct RunBody {
    info: RunInfoBody,
    #[serde(default)]
    data: RunDataBody,
}

#[derive(Deserialize)]
struct RunInfoBody {
    run_id: String,
    experiment_id: String,
    #[serde(default)]
    run_name: String,
    status: RunStatus,
    start_time: i64,
    end_time: Option<i64>,
}

#[derive(Default, Deserialize)]
struct RunDataBody {
    #[serde(default)]
    metrics: Vec<Metric>,
    #[serde(default)]
    params: Vec<ParamBody>,
}

#[derive(Serialize, Deserialize)]
struct ParamBody {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct LogMetricRequest<'a> {
    run_id: &'a str,
    key: &'a str,
    #[serde(with = "json_float")]
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Deserialize)]
struct MetricHistoryResponse {
    #[serde(default)]
    metrics: Vec<Metric>,
}

impl RestStore {
    /// Creates a new `RestStore` talking to the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!("GET {path}");
        let response = self.client.get(self.endpoint(path)).query(query).send()?;
        parse_response(response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!("POST {path}");
        let response = self.client.post(self.endpoint(path)).json(body).send()?;
        parse_response(response)
    }

    fn metric_history(&self, run_id: &str, key: &str) -> Result<Vec<Metric>> {
        let response: MetricHistoryResponse = self.get(
            "metrics/get-history",
            &[("run_id", run_id), ("metric_key", key)],
        )?;

        let mut history = response.metrics;
        history.sort_by_key(|m| (m.step, m.timestamp));
        Ok(history)
    }
}

fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }

    let body: ApiError = response.json().unwrap_or_default();
    Err(TrackingErr::Api {
        status: status.as_u16(),
        code: body.error_code,
        message: body.message,
    })
}

impl TrackingStore for RestStore {
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<String>> {
        let response = self.get::<ExperimentResponse>(
            "experiments/get-by-name",
            &[("experiment_name", name)],
        );

        match response {
            Ok(response) => Ok(Some(response.experiment.experiment_id)),
            Err(TrackingErr::Api { code, .. }) if code == NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_experiment(&self, name: &str) -> Result<String> {
        let response: CreateExperimentResponse =
            self.post("experiments/create", &json!({ "name": name }))?;

        Ok(response.experiment_id)
    }

    fn create_run(&self, experiment_id: &str, run_name: &str, start_time: i64) -> Result<String> {
        let body = json!({
            "experiment_id": experiment_id,
            "run_name": run_name,
            "start_time": start_time,
        });

        let response: RunResponse = self.post("runs/create", &body)?;
        Ok(response.run.info.run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let body = json!({ "run_id": run_id, "key": key, "value": value });

        let _: IgnoredAny = self.post("runs/log-parameter", &body)?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        validate_key(&metric.key)?;
        let body = LogMetricRequest {
            run_id,
            key: &metric.key,
            value: metric.value,
            timestamp: metric.timestamp,
            step: metric.step,
        };

        let _: IgnoredAny = self.post("runs/log-metric", &body)?;
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let body = json!({ "run_id": run_id, "status": status, "end_time": end_time });

        let _: IgnoredAny = self.post("runs/update", &body)?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let response: RunResponse = self.get("runs/get", &[("run_id", run_id)])?;
        let RunBody { info, data } = response.run;

        let params = data.params.into_iter().map(|p| (p.key, p.value)).collect();

        // `runs/get` only reports the latest value of each metric.
        let metrics = data
            .metrics
            .iter()
            .map(|latest| -> Result<(String, Vec<Metric>)> {
                Ok((latest.key.clone(), self.metric_history(run_id, &latest.key)?))
            })
            .collect::<Result<_>>()?;

        let info = RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            run_name: info.run_name,
            status: info.status,
            start_time: info.start_time,
            end_time: info.end_time,
        };

        Ok(RunRecord {
            info,
            params,
            metrics,
        })
    }
}
