//! Turns one image into one MusicXML file.
//!
//! The run is strictly sequential: check inputs, run inference, convert,
//! write, verify. Every failure is returned as a [`ProcessError`]; reporting
//! is left to the caller.

use std::fmt;
use std::path::{Path, PathBuf};

use scorelift_core::{analyze, output_path, ScoreSummary};

use crate::config::Config;
use crate::convert::{ConversionChain, StaticFallback};
use crate::error::{ProcessError, ProcessResult};
use crate::models;
use crate::progress::{PipelineEvent, ProgressSink};
use crate::recognizer::{discard_work_dir, OemerRecognizer, Recognizer};
use crate::sink::{FsSink, OutputSink};

/// A score that was written and verified.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedScore {
    /// `<output_dir>/<image stem>.xml`
    pub path: PathBuf,
    /// Size on disk after writing.
    pub bytes: u64,
    /// Conversion strategy that produced the MusicXML.
    pub strategy: String,
    /// `None` when the written text is not well-formed XML.
    pub summary: Option<ScoreSummary>,
}

impl ProcessedScore {
    pub fn used_fallback(&self) -> bool {
        self.strategy == StaticFallback::NAME
    }
}

pub struct Orchestrator {
    recognizer: Box<dyn Recognizer>,
    chain: ConversionChain,
    sink: Box<dyn OutputSink>,
    models_dir: PathBuf,
    model_subdirs: Vec<String>,
    model_extension: String,
    keep_work_dir: bool,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("recognizer", &self.recognizer.name())
            .field("chain", &self.chain.names())
            .field("models_dir", &self.models_dir)
            .field("model_subdirs", &self.model_subdirs)
            .field("model_extension", &self.model_extension)
            .field("keep_work_dir", &self.keep_work_dir)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the default model layout from
    /// [`Config::default`] and a filesystem sink.
    pub fn new(recognizer: Box<dyn Recognizer>, chain: ConversionChain) -> Self {
        let defaults = Config::default();
        Self {
            recognizer,
            chain,
            sink: Box::new(FsSink),
            models_dir: defaults.models_dir,
            model_subdirs: defaults.model_subdirs,
            model_extension: defaults.model_extension,
            keep_work_dir: defaults.keep_work_dir,
        }
    }

    /// Wire the `oemer` backend and the configured strategies for a run
    /// writing into `output_dir`.
    ///
    /// # Errors
    /// Returns [`ProcessError::Config`] if the strategy list is invalid.
    pub fn from_config(config: &Config, output_dir: &Path) -> ProcessResult<Self> {
        let recognizer = OemerRecognizer::from_config(config, output_dir);
        let chain = ConversionChain::from_names(&config.strategies)?;

        Ok(Self::new(Box::new(recognizer), chain)
            .with_models(
                config.models_dir.clone(),
                config.model_subdirs.clone(),
                config.model_extension.clone(),
            )
            .keep_work_dir(config.keep_work_dir))
    }

    #[must_use]
    pub fn with_models(
        mut self,
        models_dir: impl Into<PathBuf>,
        subdirs: Vec<String>,
        extension: impl Into<String>,
    ) -> Self {
        self.models_dir = models_dir.into();
        self.model_subdirs = subdirs;
        self.model_extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Recognize `image` and write its MusicXML into `output_dir`.
    pub async fn process_image(
        &self,
        image: &Path,
        output_dir: &Path,
        progress: &mut dyn ProgressSink,
    ) -> ProcessResult<ProcessedScore> {
        progress.emit(PipelineEvent::ProcessingImage {
            image: image.to_path_buf(),
        });

        if !image.exists() {
            return Err(ProcessError::MissingInput {
                path: image.to_path_buf(),
            });
        }
        let output_file = output_path(output_dir, image).map_err(|_| ProcessError::MissingInput {
            path: image.to_path_buf(),
        })?;

        self.check_models(progress)?;

        progress.emit(PipelineEvent::InferenceStarted {
            engine: self.recognizer.name().to_string(),
        });
        log::info!("Running inference on {}", image.display());

        let prediction = self
            .recognizer
            .infer(&self.models_dir, image)
            .await?
            .ok_or_else(|| ProcessError::InferenceEmpty {
                image: image.to_path_buf(),
            })?;

        progress.emit(PipelineEvent::InferenceCompleted {
            description: prediction.to_string(),
        });

        progress.emit(PipelineEvent::BuildingMusicXml);
        let converted = self.chain.convert(&prediction, image);

        if !self.keep_work_dir {
            if let Some(work_dir) = &prediction.work_dir {
                discard_work_dir(work_dir);
            }
        }

        let converted =
            converted.map_err(|attempts| ProcessError::ConversionExhausted { attempts })?;

        for skipped in &converted.skipped {
            progress.emit(PipelineEvent::StrategySkipped {
                strategy: skipped.strategy().to_string(),
                reason: skipped.to_string(),
            });
        }
        if converted.strategy == StaticFallback::NAME {
            progress.emit(PipelineEvent::UsingFallback);
        }

        if converted.content.is_empty() {
            return Err(ProcessError::ConversionEmpty {
                strategy: converted.strategy,
            });
        }

        let bytes = self.write_verified(&output_file, &converted.content)?;
        progress.emit(PipelineEvent::Written {
            path: output_file.clone(),
            bytes,
        });

        let summary = analyze(&converted.content);
        if let Some(summary) = &summary {
            progress.emit(PipelineEvent::Analyzed(summary.clone()));
        }

        log::info!(
            "Wrote {} via {} ({} bytes)",
            output_file.display(),
            converted.strategy,
            bytes
        );

        Ok(ProcessedScore {
            path: output_file,
            bytes,
            strategy: converted.strategy,
            summary,
        })
    }

    fn check_models(&self, progress: &mut dyn ProgressSink) -> ProcessResult<()> {
        progress.emit(PipelineEvent::LookingForModels {
            models_dir: self.models_dir.clone(),
        });

        let inventory =
            models::inspect(&self.models_dir, &self.model_subdirs, &self.model_extension)
                .map_err(|err| {
                    if let ProcessError::NoModelFiles { listing, .. } = &err {
                        for entry in listing {
                            progress.emit(PipelineEvent::ModelListing(entry.clone()));
                        }
                    }
                    err
                })?;

        for found in &inventory.found {
            progress.emit(PipelineEvent::ModelFound {
                subdir: found.subdir.clone(),
                file: found.first_file.clone(),
                path: found.path.clone(),
            });
        }
        progress.emit(PipelineEvent::UsingModels {
            models_dir: inventory.models_dir.clone(),
            found: inventory.found_names().into_iter().map(String::from).collect(),
        });

        Ok(())
    }

    /// Write `content`, then re-read the file's metadata: the write call
    /// succeeding is not taken as proof the file is there.
    fn write_verified(&self, path: &Path, content: &str) -> ProcessResult<u64> {
        let write_failed = |source| ProcessError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        self.sink.write(path, content).map_err(write_failed)?;

        let metadata = std::fs::metadata(path).map_err(write_failed)?;
        if metadata.len() == 0 {
            return Err(ProcessError::OutputEmpty {
                path: path.to_path_buf(),
            });
        }

        Ok(metadata.len())
    }
}
