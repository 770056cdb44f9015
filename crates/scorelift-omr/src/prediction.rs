use std::fmt;
use std::path::{Path, PathBuf};

/// What a recognizer hands to the conversion strategies.
///
/// The orchestrator treats this as opaque; only strategies look inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    /// The image recognition ran on.
    pub image: PathBuf,
    /// Directory the engine wrote its results into, if it used one.
    pub work_dir: Option<PathBuf>,
    /// Files the engine produced, sorted by path.
    pub artifacts: Vec<PathBuf>,
    /// Shape of the engine's raw output, when the engine reports one.
    pub shape: Option<Vec<usize>>,
}

impl Prediction {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            work_dir: None,
            artifacts: Vec::new(),
            shape: None,
        }
    }

    #[must_use]
    pub fn with_work_dir(
        mut self,
        work_dir: impl Into<PathBuf>,
        mut artifacts: Vec<PathBuf>,
    ) -> Self {
        artifacts.sort();
        self.work_dir = Some(work_dir.into());
        self.artifacts = artifacts;
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Artifacts whose file name matches `name` exactly.
    pub fn artifact_named(&self, name: &str) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == name))
            .map(PathBuf::as_path)
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            Some(shape) => {
                let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
                write!(f, "shape ({})", dims.join(", "))
            }
            None => write!(f, "{} artifact(s)", self.artifacts.len()),
        }
    }
}
