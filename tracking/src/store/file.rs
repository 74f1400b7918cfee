use std::{
    env,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TrackingStore, validate_key};
use crate::{Metric, Result, RunInfo, RunRecord, RunStatus, TrackingErr, tracker::now_millis};

const META_FILE: &str = "meta.yaml";
const DEFAULT_EXPERIMENT_ID: &str = "0";
const DEFAULT_EXPERIMENT_NAME: &str = "Default";
const ACTIVE: &str = "active";
const RUN_NAME_TAG: &str = "mlflow.runName";
const LOCAL_SOURCE_TYPE: i32 = 4;

#[derive(Debug, Serialize, Deserialize)]
struct ExperimentMeta {
    artifact_location: String,
    creation_time: i64,
    experiment_id: String,
    last_update_time: i64,
    lifecycle_stage: String,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunMeta {
    artifact_uri: String,
    end_time: Option<i64>,
    entry_point_name: String,
    experiment_id: String,
    lifecycle_stage: String,
    run_id: String,
    run_name: String,
    run_uuid: String,
    source_name: String,
    source_type: i32,
    source_version: String,
    start_time: i64,
    status: i32,
    tags: Vec<String>,
    user_id: String,
}

/// A tracking store backed by a local directory.
///
/// ```text
/// <root>/<experiment_id>/meta.yaml
/// <root>/<experiment_id>/<run_id>/meta.yaml
/// <root>/<experiment_id>/<run_id>/params/<key>    raw value
/// <root>/<experiment_id>/<run_id>/metrics/<key>   one "<timestamp> <value> <step>" line per measurement
/// <root>/<experiment_id>/<run_id>/tags/<key>      raw value
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store at `root`, creating it with its default experiment if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        fs::create_dir_all(store.root.join(".trash"))?;

        if !store.experiment_dir(DEFAULT_EXPERIMENT_ID).join(META_FILE).is_file() {
            store.write_experiment(DEFAULT_EXPERIMENT_ID, DEFAULT_EXPERIMENT_NAME)?;
        }

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dir(&self, experiment_id: &str) -> PathBuf {
        self.root.join(experiment_id)
    }

    fn write_experiment(&self, experiment_id: &str, name: &str) -> Result<()> {
        let dir = self.experiment_dir(experiment_id);
        fs::create_dir_all(&dir)?;

        let now = now_millis();
        let meta = ExperimentMeta {
            artifact_location: file_uri(&dir),
            creation_time: now,
            experiment_id: experiment_id.to_string(),
            last_update_time: now,
            lifecycle_stage: ACTIVE.to_string(),
            name: name.to_string(),
        };

        write_yaml(&dir.join(META_FILE), &meta)
    }

    /// Every experiment in the store, in no particular order.
    fn experiments(&self) -> Result<Vec<ExperimentMeta>> {
        let mut experiments = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let is_experiment = entry.file_name().to_string_lossy().parse::<u64>().is_ok();
            let meta_path = entry.path().join(META_FILE);

            if is_experiment && meta_path.is_file() {
                experiments.push(read_yaml(&meta_path)?);
            }
        }

        Ok(experiments)
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        let well_formed = !run_id.is_empty() && run_id.chars().all(|c| c.is_ascii_alphanumeric());
        if !well_formed {
            return Err(TrackingErr::UnknownRun(run_id.to_string()));
        }

        for experiment in self.experiments()? {
            let dir = self.experiment_dir(&experiment.experiment_id).join(run_id);
            if dir.join(META_FILE).is_file() {
                return Ok(dir);
            }
        }

        Err(TrackingErr::UnknownRun(run_id.to_string()))
    }

    /// Returns the run's directory, failing if the run was already ended.
    fn active_run_dir(&self, run_id: &str) -> Result<PathBuf> {
        let dir = self.run_dir(run_id)?;
        let meta: RunMeta = read_yaml(&dir.join(META_FILE))?;

        if meta.status != RunStatus::Running.code() {
            return Err(TrackingErr::RunNotActive(run_id.to_string()));
        }

        Ok(dir)
    }
}

impl TrackingStore for FileStore {
    fn get_experiment_by_name(&self, name: &str) -> Result<Option<String>> {
        let id = self
            .experiments()?
            .into_iter()
            .find(|e| e.name == name)
            .map(|e| e.experiment_id);

        Ok(id)
    }

    fn create_experiment(&self, name: &str) -> Result<String> {
        let next_id = self
            .experiments()?
            .iter()
            .filter_map(|e| e.experiment_id.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1)
            .to_string();

        self.write_experiment(&next_id, name)?;
        debug!("created experiment {name:?} with id {next_id}");
        Ok(next_id)
    }

    fn create_run(&self, experiment_id: &str, run_name: &str, start_time: i64) -> Result<String> {
        let experiment_dir = self.experiment_dir(experiment_id);
        let known = experiment_id.parse::<u64>().is_ok() && experiment_dir.join(META_FILE).is_file();
        if !known {
            return Err(TrackingErr::UnknownExperiment(experiment_id.to_string()));
        }

        let run_id = Uuid::new_v4().simple().to_string();
        let dir = experiment_dir.join(&run_id);
        for sub in ["params", "metrics", "tags", "artifacts"] {
            fs::create_dir_all(dir.join(sub))?;
        }

        let meta = RunMeta {
            artifact_uri: file_uri(&dir.join("artifacts")),
            end_time: None,
            entry_point_name: String::new(),
            experiment_id: experiment_id.to_string(),
            lifecycle_stage: ACTIVE.to_string(),
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
            run_uuid: run_id.clone(),
            source_name: String::new(),
            source_type: LOCAL_SOURCE_TYPE,
            source_version: String::new(),
            start_time,
            status: RunStatus::Running.code(),
            tags: Vec::new(),
            user_id: env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        };

        write_yaml(&dir.join(META_FILE), &meta)?;
        fs::write(dir.join("tags").join(RUN_NAME_TAG), run_name)?;

        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.active_run_dir(run_id)?.join("params").join(key);

        if path.is_file() {
            let old = fs::read_to_string(&path)?;
            if old == value {
                return Ok(());
            }

            return Err(TrackingErr::ParamConflict {
                key: key.to_string(),
                old,
                new: value.to_string(),
            });
        }

        create_parent(&path)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> Result<()> {
        validate_key(&metric.key)?;
        let path = self.active_run_dir(run_id)?.join("metrics").join(&metric.key);
        create_parent(&path)?;

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{} {} {}", metric.timestamp, metric.value, metric.step)?;
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus, end_time: i64) -> Result<()> {
        let path = self.run_dir(run_id)?.join(META_FILE);
        let mut meta: RunMeta = read_yaml(&path)?;

        meta.status = status.code();
        meta.end_time = Some(end_time);
        write_yaml(&path, &meta)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let dir = self.run_dir(run_id)?;
        let meta: RunMeta = read_yaml(&dir.join(META_FILE))?;

        let params = read_tree(&dir.join("params"))?
            .into_iter()
            .map(|(key, path)| -> Result<(String, String)> {
                Ok((key, fs::read_to_string(path)?))
            })
            .collect::<Result<_>>()?;

        let metrics = read_tree(&dir.join("metrics"))?
            .into_iter()
            .map(|(key, path)| -> Result<(String, Vec<Metric>)> {
                let history = parse_metric_lines(&key, &fs::read_to_string(path)?)?;
                Ok((key, history))
            })
            .collect::<Result<_>>()?;

        let info = RunInfo {
            run_id: meta.run_id,
            experiment_id: meta.experiment_id,
            run_name: meta.run_name,
            status: RunStatus::from_code(meta.status).unwrap_or(RunStatus::Failed),
            start_time: meta.start_time,
            end_time: meta.end_time,
        };

        Ok(RunRecord {
            info,
            params,
            metrics,
        })
    }
}

fn file_uri(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    Ok(())
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

/// Lists every file under `dir` keyed by its `/` separated path relative to `dir`.
fn read_tree(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![(String::new(), dir.to_path_buf())];

    while let Some((prefix, dir)) = pending.pop() {
        if !dir.is_dir() {
            continue;
        }

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            if entry.file_type()?.is_dir() {
                pending.push((key, entry.path()));
            } else {
                files.push((key, entry.path()));
            }
        }
    }

    Ok(files)
}

fn parse_metric_lines(key: &str, content: &str) -> Result<Vec<Metric>> {
    let malformed = |line: &str| {
        TrackingErr::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("malformed metric line for {key:?}: {line:?}"),
        ))
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace();
            let timestamp = fields.next().and_then(|f| f.parse().ok());
            let value = fields.next().and_then(|f| f.parse().ok());
            let step = fields.next().map_or(Some(0), |f| f.parse().ok());

            match (timestamp, value, step) {
                (Some(timestamp), Some(value), Some(step)) => Ok(Metric {
                    key: key.to_string(),
                    value,
                    timestamp,
                    step,
                }),
                _ => Err(malformed(line)),
            }
        })
        .collect()
}
