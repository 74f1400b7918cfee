//! Wires the training pieces together: configuration loading, the tracked training
//! pipeline and a small sequential task graph to run flows with.

pub mod configs;
pub mod dag;
pub mod error;
pub mod flow;
pub mod pipeline;

pub use error::{OrchestratorError, Result};
pub use pipeline::run_training;
