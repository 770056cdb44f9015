//! Turning a [`Prediction`] into MusicXML text.
//!
//! Each [`ConversionStrategy`] is one way of getting MusicXML out of what the
//! engine produced. A [`ConversionChain`] tries them in order and stops at the
//! first that succeeds.

use std::fmt;
use std::path::{Path, PathBuf};

use scorelift_core::fallback_musicxml;

use crate::error::{ConversionError, ProcessError, ProcessResult};
use crate::prediction::Prediction;

/// Extension the engine gives the MusicXML it writes.
const ENGINE_EXTENSION: &str = "musicxml";

/// A named way of producing MusicXML from a prediction.
pub trait ConversionStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Produce MusicXML for `image` from `prediction`.
    fn produce(&self, prediction: &Prediction, image: &Path) -> Result<String, ConversionError>;
}

/// Reads `<work_dir>/<image stem>.musicxml`, the file the engine names after
/// its input.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineOutput;

impl EngineOutput {
    pub const NAME: &'static str = "engine-output";
}

impl ConversionStrategy for EngineOutput {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn produce(&self, prediction: &Prediction, image: &Path) -> Result<String, ConversionError> {
        let unavailable = |reason: String| ConversionError::Unavailable {
            strategy: Self::NAME.to_string(),
            reason,
        };

        let work_dir = prediction
            .work_dir
            .as_deref()
            .ok_or_else(|| unavailable("prediction has no work directory".to_string()))?;
        let stem = image
            .file_stem()
            .ok_or_else(|| unavailable(format!("{} has no file stem", image.display())))?;

        let mut file_name = stem.to_os_string();
        file_name.push(".");
        file_name.push(ENGINE_EXTENSION);
        let path = work_dir.join(file_name);

        if !path.is_file() {
            return Err(unavailable(format!("{} not found", path.display())));
        }

        read_text(Self::NAME, &path)
    }
}

/// Searches everything the engine produced for a MusicXML file.
///
/// Names derived from the image are preferred (`enhanced_<stem>.musicxml`,
/// then `<stem>.musicxml`); otherwise the first `.musicxml` or `.xml`
/// artifact by path wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArtifactScan;

impl ArtifactScan {
    pub const NAME: &'static str = "artifact-scan";

    fn pick<'a>(prediction: &'a Prediction, image: &Path) -> Option<&'a Path> {
        if let Some(stem) = image.file_stem().map(|s| s.to_string_lossy()) {
            let preferred = [
                format!("enhanced_{stem}.{ENGINE_EXTENSION}"),
                format!("{stem}.{ENGINE_EXTENSION}"),
            ];
            for name in &preferred {
                if let Some(path) = prediction.artifact_named(name) {
                    return Some(path);
                }
            }
        }

        prediction
            .artifacts
            .iter()
            .find(|p| {
                p.extension().is_some_and(|ext| {
                    ext.eq_ignore_ascii_case(ENGINE_EXTENSION) || ext.eq_ignore_ascii_case("xml")
                })
            })
            .map(PathBuf::as_path)
    }
}

impl ConversionStrategy for ArtifactScan {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn produce(&self, prediction: &Prediction, image: &Path) -> Result<String, ConversionError> {
        let path = Self::pick(prediction, image).ok_or_else(|| ConversionError::Unavailable {
            strategy: Self::NAME.to_string(),
            reason: format!(
                "no MusicXML among {} engine artifact(s)",
                prediction.artifacts.len()
            ),
        })?;

        log::debug!("Found engine output at {}", path.display());
        read_text(Self::NAME, path)
    }
}

/// The fixed one-note score. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticFallback;

impl StaticFallback {
    pub const NAME: &'static str = "fallback";
}

impl ConversionStrategy for StaticFallback {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn produce(&self, _prediction: &Prediction, _image: &Path) -> Result<String, ConversionError> {
        Ok(fallback_musicxml().to_string())
    }
}

fn read_text(strategy: &str, path: &Path) -> Result<String, ConversionError> {
    std::fs::read_to_string(path).map_err(|source| ConversionError::Io {
        strategy: strategy.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

/// Look up a built-in strategy by name.
pub fn strategy_by_name(name: &str) -> Option<Box<dyn ConversionStrategy>> {
    match name {
        EngineOutput::NAME => Some(Box::new(EngineOutput)),
        ArtifactScan::NAME => Some(Box::new(ArtifactScan)),
        StaticFallback::NAME => Some(Box::new(StaticFallback)),
        _ => None,
    }
}

/// MusicXML produced by a chain, with the strategies skipped on the way.
#[derive(Debug)]
pub struct Converted {
    pub strategy: String,
    pub content: String,
    pub skipped: Vec<ConversionError>,
}

/// An ordered list of strategies.
#[derive(Debug)]
pub struct ConversionChain {
    strategies: Vec<Box<dyn ConversionStrategy>>,
}

impl ConversionChain {
    pub fn new(strategies: Vec<Box<dyn ConversionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build a chain from strategy names, as listed in configuration.
    ///
    /// # Errors
    /// Returns [`ProcessError::Config`] for an unknown name or an empty list.
    pub fn from_names(names: &[String]) -> ProcessResult<Self> {
        if names.is_empty() {
            return Err(ProcessError::Config(
                "at least one conversion strategy is required".to_string(),
            ));
        }

        let strategies = names
            .iter()
            .map(|name| {
                strategy_by_name(name).ok_or_else(|| {
                    ProcessError::Config(format!(
                        "unknown conversion strategy '{name}' (expected one of: {}, {}, {})",
                        EngineOutput::NAME,
                        ArtifactScan::NAME,
                        StaticFallback::NAME
                    ))
                })
            })
            .collect::<ProcessResult<Vec<_>>>()?;

        Ok(Self::new(strategies))
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order.
    ///
    /// # Errors
    /// Returns every strategy's error, in order, if none succeeded.
    pub fn convert(
        &self,
        prediction: &Prediction,
        image: &Path,
    ) -> Result<Converted, Vec<ConversionError>> {
        let mut skipped = Vec::new();

        for strategy in &self.strategies {
            match strategy.produce(prediction, image) {
                Ok(content) => {
                    return Ok(Converted {
                        strategy: strategy.name().to_string(),
                        content,
                        skipped,
                    });
                }
                Err(e) => {
                    log::debug!("Conversion strategy {} did not apply: {}", strategy.name(), e);
                    skipped.push(e);
                }
            }
        }

        Err(skipped)
    }
}

impl Default for ConversionChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(EngineOutput),
            Box::new(ArtifactScan),
            Box::new(StaticFallback),
        ])
    }
}
