//! Error handling for the kbir build pipeline
//!
//! This module defines the single error taxonomy used throughout the
//! builder. Every external-tool failure is converted into a `BuildError`
//! at the point of invocation; raw exit codes never cross a component
//! boundary.

use thiserror::Error;

/// Main error type covering all phases of an IR build
#[derive(Error, Debug)]
pub enum BuildError {
    /// The build system has no rule for the requested module or object,
    /// even after the underscore/hyphen retry.
    #[error("no such target: {target}")]
    TargetNotFound { target: String },

    /// A compiler, linker, optimizer, or build-system invocation exited
    /// non-zero.
    #[error("{tool} failed for {artifact}")]
    ToolFailed { tool: String, artifact: String },

    /// A tool reported success but the expected file is absent.
    #[error("expected artifact {path} was not produced")]
    ArtifactMissing { path: String },

    /// A translated command lacks a required output designation, or a
    /// trace contains no recognizable compiler statement.
    #[error("malformed command: {reason}")]
    MalformedCommand { reason: String },

    /// Module-name extraction matched neither tolerated form.
    #[error("cannot resolve module name for {object}")]
    NameResolution { object: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl BuildError {
    /// Create a tool-invocation failure for a specific artifact
    pub fn tool_failed(tool: &str, artifact: String) -> Self {
        BuildError::ToolFailed {
            tool: tool.to_string(),
            artifact,
        }
    }

    /// Create a malformed-command error
    pub fn malformed(reason: String) -> Self {
        BuildError::MalformedCommand { reason }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        BuildError::Io {
            message: err.to_string(),
        }
    }
}
