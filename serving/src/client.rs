use std::{env, time::Duration};

use log::debug;
use reqwest::blocking::Client;

use crate::error::Result;

/// The environment variable holding the serving endpoint's base url.
pub const SERVING_URL_ENV: &str = "SERVING_URL";

pub const DEFAULT_SERVING_URL: &str = "http://localhost:8080";

/// How long every request may take, connecting included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const HEALTH_PATH: &str = "/health";

/// The endpoint named by `SERVING_URL`, defaulting to `http://localhost:8080` when it's unset
/// or empty.
pub fn serving_url_from_env() -> String {
    serving_url_or_default(env::var(SERVING_URL_ENV).ok())
}

fn serving_url_or_default(value: Option<String>) -> String {
    value
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVING_URL.to_string())
}

/// The state of the serving endpoint as seen by a health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The connection was refused or timed out, there's nothing to test against.
    Unreachable(String),
    /// The health check answered with a non success status.
    Unhealthy(u16),
    /// The request failed for a reason other than reachability.
    Broken(String),
    Ready,
}

/// A blocking http client bound to a serving endpoint.
#[derive(Debug, Clone)]
pub struct SmokeClient {
    base_url: String,
    client: Client,
}

impl SmokeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Targets `serving_url_from_env()` with a 5 second timeout.
    pub fn from_env() -> Result<Self> {
        Self::new(&serving_url_from_env(), DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues `GET <base_url><path>` and returns the response status.
    pub fn get_status(&self, path: &str) -> reqwest::Result<u16> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send()?;

        debug!("GET {url} -> {}", response.status());
        Ok(response.status().as_u16())
    }

    /// Checks whether the endpoint is up by requesting its health route.
    pub fn probe(&self) -> Probe {
        match self.get_status(HEALTH_PATH) {
            Ok(status) if (200..300).contains(&status) => Probe::Ready,
            Ok(status) => Probe::Unhealthy(status),
            Err(e) if is_unreachable(&e) => Probe::Unreachable(e.to_string()),
            Err(e) => Probe::Broken(e.to_string()),
        }
    }
}

fn is_unreachable(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let client = SmokeClient::new("http://serving:8080/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://serving:8080");
    }

    #[test]
    fn serving_url_falls_back_to_the_default() {
        assert_eq!(serving_url_or_default(None), DEFAULT_SERVING_URL);
        assert_eq!(serving_url_or_default(Some(String::new())), DEFAULT_SERVING_URL);
        assert_eq!(serving_url_or_default(Some("  ".to_string())), DEFAULT_SERVING_URL);
        assert_eq!(
            serving_url_or_default(Some("http://serving:9000".to_string())),
            "http://serving:9000"
        );
    }

    #[test]
    fn from_env_targets_the_resolved_url() {
        let client = SmokeClient::from_env().unwrap();
        let expected = serving_url_from_env();

        assert_eq!(client.base_url(), expected.trim_end_matches('/'));
    }
}
