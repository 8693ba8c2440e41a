//! Error taxonomy for the install pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop an install.
///
/// Only [`InstallError::InputValidation`] is recoverable (the prompt asks
/// again). Every other variant aborts the run.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// An external tool could not be started or exited non-zero.
    #[error("'{program}' failed: {detail}")]
    ExternalTool { program: String, detail: String },

    #[error("could not resolve base image: {0}")]
    NetworkResolution(String),

    #[error("integrity check failed for {file}: expected {expected}, got {actual}")]
    IntegrityVerification {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("{}: {source}", path.display())]
    FilesystemPrecondition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    pub fn tool(program: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalTool {
            program: program.into(),
            detail: detail.into(),
        }
    }

    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FilesystemPrecondition {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;
