use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid input {}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Invalid {stage} operation: {reason}")]
    InvalidOperation { stage: Stage, reason: String },

    #[error("Project metadata error: {0}")]
    Metadata(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
