//! Optical music recognition orchestration for scorelift.
//!
//! Locates the engine's checkpoints, runs the engine on an image, turns its
//! result into MusicXML through an ordered chain of conversion strategies,
//! and writes the score next to its siblings in an output directory.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod convert;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod prediction;
pub mod progress;
pub mod recognizer;
pub mod sink;
pub mod status;

pub use config::Config;
pub use convert::{ConversionChain, ConversionStrategy};
pub use error::{ConversionError, FailureKind, ProcessError, ProcessResult, RecognizeError};
pub use orchestrator::{Orchestrator, ProcessedScore};
pub use prediction::Prediction;
pub use progress::{NoProgress, PipelineEvent, ProgressSink};
pub use recognizer::{OemerRecognizer, Recognizer};
pub use sink::{FsSink, OutputSink};
pub use status::{check_environment, EnvironmentStatus};
