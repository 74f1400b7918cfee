use std::{env, fmt, path::PathBuf};

/// The environment variable holding the tracking destination.
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";

/// The environment variable holding the artifact store endpoint.
pub const S3_ENDPOINT_ENV: &str = "MLFLOW_S3_ENDPOINT_URL";

const DEFAULT_LOCAL_DIR: &str = "mlruns";

/// Where experiment data is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUri {
    /// A directory handled by a `FileStore`.
    Local(PathBuf),
    /// The base url of a tracking server.
    Remote(String),
}

impl TrackingUri {
    /// Parses a tracking uri: `http(s)://` urls are remote, `file://` urls and bare paths are
    /// local and an empty string means the default `./mlruns` directory.
    pub fn parse(uri: &str) -> Self {
        let uri = uri.trim();

        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Self::Remote(uri.trim_end_matches('/').to_string());
        }

        let path = uri.strip_prefix("file://").unwrap_or(uri);
        if path.is_empty() {
            return Self::Local(PathBuf::from(DEFAULT_LOCAL_DIR));
        }

        Self::Local(PathBuf::from(path))
    }

    /// Reads the uri from `MLFLOW_TRACKING_URI`, defaulting to `./mlruns`.
    pub fn from_env() -> Self {
        Self::parse(&env::var(TRACKING_URI_ENV).unwrap_or_default())
    }

    /// Reads the artifact store endpoint from `MLFLOW_S3_ENDPOINT_URL`, if set.
    pub fn s3_endpoint_from_env() -> Option<String> {
        env::var(S3_ENDPOINT_ENV).ok().filter(|url| !url.is_empty())
    }
}

impl fmt::Display for TrackingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "file://{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}
