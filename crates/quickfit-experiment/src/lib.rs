//! Experiment tracking and the train/evaluate pipeline.
//!
//! [`ExperimentRecorder`] holds one experiment's trained models, metric
//! series, and feature importances and flushes them to
//! `{output_dir}/{experiment_id}/`. [`run_pipeline`] drives a CSV dataset
//! through load, preprocess, split, task resolution, training, evaluation,
//! and persistence, returning a [`RunReport`] either way.
//! [`train_standalone`] is the fixed-configuration classifier trainer.

mod error;
mod pipeline;
mod preprocess;
mod recorder;
mod trainer;

pub use error::ExperimentError;
pub use pipeline::{run_pipeline, RunConfig, RunReport, Stage, DEFAULT_OUTPUT_DIR, DEFAULT_TEST_SIZE};
pub use preprocess::{encode_target, one_hot, Preprocessed};
pub use recorder::{
    ExperimentRecorder, MetricPoint, ResultsDocument, DEFAULT_MODEL_FILE, DEFAULT_RESULTS_FILE,
};
pub use trainer::{train_standalone, TrainerReport};

/// Render an error and its chain of sources as one line.
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
