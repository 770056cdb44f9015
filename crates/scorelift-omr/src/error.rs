//! Error types for the recognition pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::models::DirListing;

/// Errors raised by a [`Recognizer`](crate::recognizer::Recognizer).
#[derive(Debug, Error)]
pub enum RecognizeError {
    /// The engine program could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// The engine did not finish within the configured limit.
    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },

    /// Preparing or reading the engine's work directory failed.
    #[error("engine work directory {}: {source}", .path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single conversion strategy did not produce MusicXML.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The strategy does not apply to this prediction.
    #[error("{strategy} unavailable: {reason}")]
    Unavailable { strategy: String, reason: String },

    /// The strategy applied but failed.
    #[error("{strategy} failed: {message}")]
    Failed { strategy: String, message: String },

    /// Reading a file the strategy needed failed.
    #[error("{strategy} could not read {}: {source}", .path.display())]
    Io {
        strategy: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    /// Name of the strategy that reported this error.
    pub fn strategy(&self) -> &str {
        match self {
            Self::Unavailable { strategy, .. }
            | Self::Failed { strategy, .. }
            | Self::Io { strategy, .. } => strategy,
        }
    }
}

/// The failure categories a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    MissingInput,
    MissingModelDir,
    NoModelFiles,
    Inference,
    InferenceEmpty,
    ConversionFailed,
    WriteFailed,
    OutputEmpty,
    Config,
}

impl FailureKind {
    /// Stable identifier, suitable for scripts.
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingInput => "MISSING_INPUT",
            Self::MissingModelDir => "MISSING_MODEL_DIR",
            Self::NoModelFiles => "NO_MODEL_FILES",
            Self::Inference => "INFERENCE_FAILED",
            Self::InferenceEmpty => "INFERENCE_EMPTY",
            Self::ConversionFailed => "MUSICXML_GENERATION_FAILED",
            Self::WriteFailed => "WRITE_FAILED",
            Self::OutputEmpty => "OUTPUT_EMPTY",
            Self::Config => "CONFIG",
        }
    }
}

/// Errors that end a `process_image` run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Input image file not found: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("OMR models not found at: {}", .path.display())]
    MissingModelDir { path: PathBuf },

    #[error("No {extension} model files found in {} subdirectories: {}", .models_dir.display(), .searched.join(", "))]
    NoModelFiles {
        models_dir: PathBuf,
        searched: Vec<String>,
        extension: String,
        listing: Vec<DirListing>,
    },

    #[error("inference failed")]
    Inference(#[from] RecognizeError),

    #[error("inference returned nothing for {}", .image.display())]
    InferenceEmpty { image: PathBuf },

    #[error("Failed to generate MusicXML: all {} strategies failed", .attempts.len())]
    ConversionExhausted { attempts: Vec<ConversionError> },

    #[error("Failed to generate MusicXML: {strategy} produced empty content")]
    ConversionEmpty { strategy: String },

    #[error("Failed to write output file: {}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output file is empty: {}", .path.display())]
    OutputEmpty { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProcessError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingInput { .. } => FailureKind::MissingInput,
            Self::MissingModelDir { .. } => FailureKind::MissingModelDir,
            Self::NoModelFiles { .. } => FailureKind::NoModelFiles,
            Self::Inference(_) => FailureKind::Inference,
            Self::InferenceEmpty { .. } => FailureKind::InferenceEmpty,
            Self::ConversionExhausted { .. } | Self::ConversionEmpty { .. } => {
                FailureKind::ConversionFailed
            }
            Self::WriteFailed { .. } => FailureKind::WriteFailed,
            Self::OutputEmpty { .. } => FailureKind::OutputEmpty,
            Self::Config(_) => FailureKind::Config,
        }
    }

    /// Returns `true` when the failure happened before the engine ran.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::MissingInput | FailureKind::MissingModelDir | FailureKind::NoModelFiles
        )
    }
}

/// Convenience alias for pipeline results.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
