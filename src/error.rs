use thiserror::Error;

/// Error taxonomy for the documentation pipeline.
///
/// The fatal/non-fatal split is a pipeline policy, not a property of the
/// variant itself: `ContentUnavailable` and `AnalysisError` are isolated per
/// file by the worker, everything else fails the whole job.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),

    #[error("upstream repository host unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("repository path not found: {0}")]
    NotFound(String),

    #[error("content unavailable for {path}: {reason}")]
    ContentUnavailable { path: String, reason: String },

    #[error("analysis failed for {file}: {reason}")]
    AnalysisError { file: String, reason: String },

    #[error("job store write failed: {0}")]
    PersistenceError(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
