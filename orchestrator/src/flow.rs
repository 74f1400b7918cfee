use serde_json::{Value, json};

use crate::{
    dag::{Dag, DagErr},
    error::Result,
};

/// The name the training flow reports itself with.
pub const FLOW_NAME: &str = "training-pipeline";

/// Builds the training flow: `load_data` -> `train_model` -> `log_results`.
///
/// The tasks are placeholders returning fixed values, meant to be replaced with calls into
/// the real pipeline.
pub fn training_flow() -> Dag<Value> {
    let mut dag = Dag::new(FLOW_NAME);

    dag.add_task("load_data", &[], |_| {
        println!("Loading data...");
        Ok(json!({ "x": "data", "y": "labels" }))
    })
    .add_task("train_model", &["load_data"], |inputs| {
        let data = inputs.require("load_data")?;
        let items = data.as_object().map_or(0, |o| o.len());

        println!("Training model on {items} items...");
        Ok(json!({ "accuracy": 0.95 }))
    })
    .add_task("log_results", &["train_model"], |inputs| {
        let metrics = inputs.require("train_model")?;

        println!("Logging metrics: {metrics}");
        Ok(Value::Null)
    });

    dag
}

/// Runs the training flow and returns the metrics produced by `train_model`.
pub fn training_pipeline() -> Result<Value> {
    let mut outputs = training_flow().run()?;

    outputs.remove("train_model").ok_or_else(|| {
        DagErr::MissingInput {
            task: FLOW_NAME.to_string(),
            input: "train_model".to_string(),
        }
        .into()
    })
}
