//! Progress events emitted while an image is processed.
//!
//! Events are informational. They are what a human watching the run sees;
//! control flow never depends on them.

use std::fmt;
use std::path::PathBuf;

use scorelift_core::ScoreSummary;

use crate::models::DirListing;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    ProcessingImage { image: PathBuf },
    LookingForModels { models_dir: PathBuf },
    ModelFound { subdir: String, file: String, path: PathBuf },
    /// Diagnostic listing emitted when no model files were found.
    ModelListing(DirListing),
    UsingModels { models_dir: PathBuf, found: Vec<String> },
    InferenceStarted { engine: String },
    InferenceCompleted { description: String },
    BuildingMusicXml,
    StrategySkipped { strategy: String, reason: String },
    UsingFallback,
    Written { path: PathBuf, bytes: u64 },
    Analyzed(ScoreSummary),
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessingImage { image } => write!(f, "Processing image: {}", image.display()),
            Self::LookingForModels { models_dir } => {
                write!(f, "Looking for models in: {}", models_dir.display())
            }
            Self::ModelFound { subdir, file, path } => {
                write!(f, "Found model in {subdir}: {file} at {}", path.display())
            }
            Self::ModelListing(listing) => write!(f, "{listing}"),
            Self::UsingModels { models_dir, found } => write!(
                f,
                "Using checkpoints directory: {} (found models in: {})",
                models_dir.display(),
                found.join(", ")
            ),
            Self::InferenceStarted { engine } => write!(f, "Running {engine} inference..."),
            Self::InferenceCompleted { description } => {
                write!(f, "Inference completed, prediction: {description}")
            }
            Self::BuildingMusicXml => f.write_str("Building MusicXML from prediction..."),
            Self::StrategySkipped { strategy, reason } => {
                write!(f, "Skipping {strategy}: {reason}")
            }
            Self::UsingFallback => f.write_str("Using fallback MusicXML generation..."),
            Self::Written { path, bytes } => {
                write!(f, "Wrote {} ({bytes} bytes)", path.display())
            }
            Self::Analyzed(summary) => write!(
                f,
                "Detected {} measure(s), {} note(s), {} rest(s); confidence {:.1}%",
                summary.measures,
                summary.notes,
                summary.rests,
                summary.confidence * 100.0
            ),
        }
    }
}

/// Receives [`PipelineEvent`]s.
pub trait ProgressSink {
    fn emit(&mut self, event: PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&mut self, _event: PipelineEvent) {}
}

/// Collects events, mostly for tests and for callers that report later.
impl ProgressSink for Vec<PipelineEvent> {
    fn emit(&mut self, event: PipelineEvent) {
        self.push(event);
    }
}
