//! Smoke checks for a model serving endpoint that skip themselves when the endpoint
//! isn't running.

mod client;
mod error;
mod suite;

pub use client::{
    DEFAULT_SERVING_URL, DEFAULT_TIMEOUT, HEALTH_PATH, Probe, SERVING_URL_ENV, SmokeClient,
    serving_url_from_env,
};
pub use error::{Result, SmokeErr};
pub use suite::{Check, Outcome, Report, SmokeSuite, any_failed};
