use log::{info, warn};
use uuid::Uuid;

use crate::{
    ActiveRun, FileStore, RestStore, Result, RunRecord, RunStatus, TrackingErr, TrackingStore,
    TrackingUri,
};

/// A named group of runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub id: String,
    pub name: String,
}

/// The entry point of the tracking api, it resolves experiments and opens runs on a store.
pub struct Tracker {
    store: Box<dyn TrackingStore>,
    description: String,
}

impl Tracker {
    /// Creates a new `Tracker` on top of an already built store.
    pub fn new<S: TrackingStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
            description: "custom store".to_string(),
        }
    }

    /// Opens the store `uri` points to.
    pub fn from_uri(uri: &TrackingUri) -> Result<Self> {
        let store: Box<dyn TrackingStore> = match uri {
            TrackingUri::Local(path) => Box::new(FileStore::open(path.clone())?),
            TrackingUri::Remote(url) => Box::new(RestStore::new(url)?),
        };

        Ok(Self {
            store,
            description: uri.to_string(),
        })
    }

    /// Opens the store named by `MLFLOW_TRACKING_URI`, defaulting to `./mlruns`.
    pub fn from_env() -> Result<Self> {
        let uri = TrackingUri::from_env();
        info!("tracking to {uri}");

        if let Some(endpoint) = TrackingUri::s3_endpoint_from_env() {
            info!("artifact store endpoint is {endpoint}");
        }

        Self::from_uri(&uri)
    }

    pub fn store(&self) -> &dyn TrackingStore {
        self.store.as_ref()
    }

    /// Where this tracker writes to.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the experiment called `name`, creating it if it doesn't exist yet.
    pub fn set_experiment(&self, name: &str) -> Result<Experiment> {
        let id = match self.store.get_experiment_by_name(name)? {
            Some(id) => id,
            None => {
                info!("creating experiment {name:?}");
                self.store.create_experiment(name)?
            }
        };

        Ok(Experiment {
            id,
            name: name.to_string(),
        })
    }

    /// Opens a new run in `experiment`.
    ///
    /// The returned run must be closed with `ActiveRun::end`, otherwise it ends as `FAILED`
    /// when dropped.
    pub fn start_run(&self, experiment: &Experiment) -> Result<ActiveRun<'_>> {
        let run_name = format!("run-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let run_id = self
            .store
            .create_run(&experiment.id, &run_name, now_millis())?;

        info!(
            "started run {run_id} ({run_name}) in experiment {:?}",
            experiment.name
        );
        Ok(ActiveRun::new(self, run_id, experiment.id.clone()))
    }

    /// Runs `f` inside a new run of `experiment`.
    ///
    /// The run ends as `FINISHED` if `f` returns `Ok` and as `FAILED` if it returns `Err` or
    /// panics. The error or panic is passed on to the caller unchanged.
    pub fn with_run<T, E, F>(&self, experiment: &Experiment, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut ActiveRun<'_>) -> std::result::Result<T, E>,
        E: From<TrackingErr>,
    {
        let mut run = self.start_run(experiment)?;

        match f(&mut run) {
            Ok(value) => {
                run.end(RunStatus::Finished)?;
                Ok(value)
            }
            Err(e) => {
                let run_id = run.id().to_string();
                if let Err(end_err) = run.end(RunStatus::Failed) {
                    warn!("failed to mark run {run_id} as failed: {end_err}");
                }
                Err(e)
            }
        }
    }

    pub fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.store.get_run(run_id)
    }
}

/// Milliseconds since the unix epoch.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
