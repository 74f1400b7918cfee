use std::{
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use serde_json::Value;
use tracking::{RestStore, RunStatus, Tracker, TrackingErr};

const PREFIX: &str = "/api/2.0/mlflow/";

#[derive(Debug, Clone)]
struct Request {
    method: String,
    target: String,
    body: String,
}

/// A tracking server double that records every request and answers from `route`.
struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl StubServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &recorded);
            }
        });

        Self { url, requests }
    }

    fn tracker(&self) -> Tracker {
        Tracker::new(RestStore::new(&self.url).unwrap())
    }

    /// The endpoints hit so far, without the api prefix and query.
    fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                let path = r.target.split('?').next().unwrap_or_default();
                path.trim_start_matches(PREFIX).to_string()
            })
            .collect()
    }

    fn body_of(&self, path: &str) -> Value {
        let requests = self.requests.lock().unwrap();
        let request = requests
            .iter()
            .find(|r| r.method == "POST" && r.target == format!("{PREFIX}{path}"))
            .unwrap();

        serde_json::from_str(&request.body).unwrap()
    }

    fn targets(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.target.clone())
            .collect()
    }
}

fn serve(mut stream: TcpStream, recorded: &Mutex<Vec<Request>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {
                let header = header.to_ascii_lowercase();
                if let Some(value) = header.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
    }

    let mut body = vec![0; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let mut parts = request_line.split_whitespace();
    let request = Request {
        method: parts.next().unwrap_or_default().to_string(),
        target: parts.next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let (status, payload) = route(&request);
    recorded.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

fn api_error(status: u16, code: &str, message: &str) -> (u16, String) {
    let body = serde_json::json!({ "error_code": code, "message": message });
    (status, body.to_string())
}

fn route(request: &Request) -> (u16, String) {
    let target = request.target.trim_start_matches(PREFIX);
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    match (request.method.as_str(), path) {
        ("GET", "experiments/get-by-name") => match query {
            "experiment_name=existing" => (
                200,
                r#"{"experiment": {"experiment_id": "7", "name": "existing"}}"#.to_string(),
            ),
            "experiment_name=locked" => api_error(500, "INTERNAL_ERROR", "database is locked"),
            _ => api_error(404, "RESOURCE_DOES_NOT_EXIST", "no such experiment"),
        },
        ("POST", "experiments/create") if request.body.contains("rejected") => {
            api_error(400, "INVALID_PARAMETER_VALUE", "name is reserved")
        }
        ("POST", "experiments/create") => (200, r#"{"experiment_id": "8"}"#.to_string()),
        ("POST", "runs/create") => (
            200,
            r#"{"run": {"info": {"run_id": "r1", "experiment_id": "8",
                "status": "RUNNING", "start_time": 1}}}"#
                .to_string(),
        ),
        ("POST", "runs/log-parameter" | "runs/log-metric" | "runs/update") => {
            (200, "{}".to_string())
        }
        ("GET", "runs/get") => match query {
            "run_id=r1" => (
                200,
                r#"{"run": {
                    "info": {"run_id": "r1", "experiment_id": "8", "run_name": "run-1",
                        "status": "FINISHED", "start_time": 1, "end_time": 3},
                    "data": {
                        "metrics": [
                            {"key": "final_loss", "value": 0.5, "timestamp": 2, "step": 1},
                            {"key": "grad_norm", "value": "NaN", "timestamp": 2, "step": 0}
                        ],
                        "params": [{"key": "lr", "value": "0.01"}]
                    }
                }}"#
                .to_string(),
            ),
            "run_id=garbled" => (502, "bad gateway".to_string()),
            _ => api_error(404, "RESOURCE_DOES_NOT_EXIST", "no such run"),
        },
        ("GET", "metrics/get-history") if query.contains("metric_key=final_loss") => (
            200,
            r#"{"metrics": [
                {"key": "final_loss", "value": 0.5, "timestamp": 2, "step": 1},
                {"key": "final_loss", "value": 0.7, "timestamp": 1, "step": 0}
            ]}"#
            .to_string(),
        ),
        ("GET", "metrics/get-history") => (
            200,
            r#"{"metrics": [{"key": "grad_norm", "value": "NaN", "timestamp": 2, "step": 0}]}"#
                .to_string(),
        ),
        _ => api_error(404, "ENDPOINT_NOT_FOUND", "unknown endpoint"),
    }
}

#[test]
fn existing_experiment_is_reused() {
    let server = StubServer::start();
    let tracker = server.tracker();

    let experiment = tracker.set_experiment("existing").unwrap();

    assert_eq!(experiment.id, "7");
    assert_eq!(server.paths(), ["experiments/get-by-name"]);
}

#[test]
fn missing_experiment_is_created() {
    let server = StubServer::start();
    let tracker = server.tracker();

    let experiment = tracker.set_experiment("training").unwrap();

    assert_eq!(experiment.id, "8");
    assert_eq!(
        server.paths(),
        ["experiments/get-by-name", "experiments/create"]
    );
    assert_eq!(server.body_of("experiments/create")["name"], "training");
}

#[test]
fn successful_run_is_reported_finished() {
    let server = StubServer::start();
    let tracker = server.tracker();
    let experiment = tracker.set_experiment("training").unwrap();

    let run_id = tracker
        .with_run(&experiment, |run| -> Result<String, TrackingErr> {
            run.log_param("lr", 0.01)?;
            run.log_metric("final_loss", 0.5, 1)?;
            Ok(run.id().to_string())
        })
        .unwrap();

    assert_eq!(run_id, "r1");
    assert_eq!(
        &server.paths()[2..],
        [
            "runs/create",
            "runs/log-parameter",
            "runs/log-metric",
            "runs/update"
        ]
    );

    let create = server.body_of("runs/create");
    assert_eq!(create["experiment_id"], "8");
    assert!(create["run_name"].as_str().unwrap().starts_with("run-"));

    let param = server.body_of("runs/log-parameter");
    assert_eq!(param["run_id"], "r1");
    assert_eq!(param["key"], "lr");
    assert_eq!(param["value"], "0.01");

    let metric = server.body_of("runs/log-metric");
    assert_eq!(metric["value"], 0.5);
    assert_eq!(metric["step"], 1);

    let update = server.body_of("runs/update");
    assert_eq!(update["run_id"], "r1");
    assert_eq!(update["status"], "FINISHED");
    assert!(update["end_time"].as_i64().unwrap() > 0);
}

#[test]
fn failing_body_is_reported_failed() {
    let server = StubServer::start();
    let tracker = server.tracker();
    let experiment = tracker.set_experiment("training").unwrap();

    let result = tracker.with_run(&experiment, |run| run.log_param("not*a*key", 1));

    assert!(matches!(result, Err(TrackingErr::InvalidKey(_))));
    assert!(!server.paths().contains(&"runs/log-parameter".to_string()));
    assert_eq!(server.body_of("runs/update")["status"], "FAILED");
}

#[test]
fn non_finite_metrics_are_sent_as_strings() {
    let server = StubServer::start();
    let tracker = server.tracker();
    let experiment = tracker.set_experiment("training").unwrap();

    tracker
        .with_run(&experiment, |run| run.log_metric("final_loss", f64::NAN, 0))
        .unwrap();

    let metric = server.body_of("runs/log-metric");
    assert_eq!(metric["key"], "final_loss");
    assert_eq!(metric["value"], "NaN");
}

#[test]
fn get_run_fetches_each_metric_history() {
    let server = StubServer::start();
    let tracker = server.tracker();

    let record = tracker.get_run("r1").unwrap();

    assert_eq!(record.info.status, RunStatus::Finished);
    assert_eq!(record.info.end_time, Some(3));
    assert_eq!(record.info.run_name, "run-1");
    assert_eq!(record.params["lr"], "0.01");

    let steps: Vec<_> = record.metrics["final_loss"].iter().map(|m| m.step).collect();
    assert_eq!(steps, [0, 1]);
    assert_eq!(record.latest_metric("final_loss"), Some(0.5));
    assert!(record.latest_metric("grad_norm").unwrap().is_nan());

    let histories: Vec<_> = server
        .targets()
        .into_iter()
        .filter(|t| t.contains("metrics/get-history"))
        .collect();
    assert_eq!(histories.len(), 2);
    assert!(histories.iter().all(|t| t.contains("run_id=r1")));
}

#[test]
fn server_errors_keep_status_and_code() {
    let server = StubServer::start();
    let tracker = server.tracker();

    match tracker.set_experiment("locked") {
        Err(TrackingErr::Api {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 500);
            assert_eq!(code, "INTERNAL_ERROR");
            assert_eq!(message, "database is locked");
        }
        other => panic!("expected an api error, got {other:?}"),
    }

    assert!(matches!(
        tracker.set_experiment("rejected"),
        Err(TrackingErr::Api { status: 400, ref code, .. }) if code == "INVALID_PARAMETER_VALUE"
    ));
}

#[test]
fn unknown_run_is_not_swallowed() {
    let server = StubServer::start();
    let tracker = server.tracker();

    assert!(matches!(
        tracker.get_run("missing"),
        Err(TrackingErr::Api { status: 404, ref code, .. }) if code == "RESOURCE_DOES_NOT_EXIST"
    ));
}

#[test]
fn error_without_a_json_body_keeps_the_status() {
    let server = StubServer::start();
    let tracker = server.tracker();

    assert!(matches!(
        tracker.get_run("garbled"),
        Err(TrackingErr::Api { status: 502, ref code, .. }) if code.is_empty()
    ));
}
