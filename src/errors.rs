use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for label parsing, corpus decoding, and persistence failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid age '{value}': {reason}")]
    InvalidAge { value: String, reason: String },
    #[error("invalid labels in '{source_name}': {details}")]
    InvalidLabel { source_name: String, details: String },
    #[error("not a directory: {}", path.display())]
    SourceNotFound { path: PathBuf },
    #[error("failed to decode '{}': {details}", path.display())]
    Decode { path: PathBuf, details: String },
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("refusing to replace destination '{}': {reason}", path.display())]
    DestinationConflict { path: PathBuf, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("background worker '{worker}' stopped: {reason}")]
    WorkerStopped { worker: String, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// True for errors scoped to one row or one file, which never abort a scan.
    pub fn is_unit_scoped(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidAge { .. }
                | PipelineError::InvalidLabel { .. }
                | PipelineError::Decode { .. }
        )
    }
}
