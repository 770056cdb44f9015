//! Checks on the engine's checkpoint directory.
//!
//! Only presence is verified: a model subdirectory counts as found when it
//! holds at least one file with the configured extension. Nothing is opened.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ProcessError, ProcessResult};

/// Extensions the engine ships its weights with.
const CHECKPOINT_EXTENSIONS: &[&str] = &["onnx", "pkl"];

/// A model subdirectory that passed the presence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundModel {
    /// Subdirectory name, as configured.
    pub subdir: String,
    /// Full path to the subdirectory.
    pub path: PathBuf,
    /// First model file in the subdirectory, by name.
    pub first_file: String,
}

/// The result of a successful [`inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInventory {
    pub models_dir: PathBuf,
    pub found: Vec<FoundModel>,
}

impl ModelInventory {
    pub fn found_names(&self) -> Vec<&str> {
        self.found.iter().map(|m| m.subdir.as_str()).collect()
    }
}

/// Directory contents captured for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    /// Label used when reporting: the directory's name relative to the
    /// models root, or the root itself.
    pub label: String,
    /// Sorted entry names, or the error that prevented listing.
    pub entries: Result<Vec<String>, String>,
}

impl fmt::Display for DirListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entries {
            Ok(entries) => write!(f, "Contents of {}: [{}]", self.label, entries.join(", ")),
            Err(e) => write!(f, "Error listing {}: {}", self.label, e),
        }
    }
}

/// Verify the models directory and find the configured model subdirectories.
///
/// # Errors
/// - [`ProcessError::MissingModelDir`] if `models_dir` does not exist
/// - [`ProcessError::NoModelFiles`] if none of `subdirs` holds a file ending
///   in `.{extension}`; the error carries a listing of `models_dir`
pub fn inspect(
    models_dir: &Path,
    subdirs: &[String],
    extension: &str,
) -> ProcessResult<ModelInventory> {
    if !models_dir.exists() {
        return Err(ProcessError::MissingModelDir {
            path: models_dir.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    for subdir in subdirs {
        let path = models_dir.join(subdir);
        if !path.is_dir() {
            log::debug!("Model subdirectory missing: {}", path.display());
            continue;
        }

        match model_files(&path, extension) {
            Ok(files) => {
                if let Some(first_file) = files.into_iter().next() {
                    found.push(FoundModel {
                        subdir: subdir.clone(),
                        path,
                        first_file,
                    });
                }
            }
            Err(e) => log::warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    if found.is_empty() {
        return Err(ProcessError::NoModelFiles {
            models_dir: models_dir.to_path_buf(),
            searched: subdirs.to_vec(),
            extension: extension.to_string(),
            listing: list_contents(models_dir),
        });
    }

    Ok(ModelInventory {
        models_dir: models_dir.to_path_buf(),
        found,
    })
}

/// Sorted names of the files in `dir` ending in `.{extension}`.
fn model_files(dir: &Path, extension: &str) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            if let Some(name) = path.file_name() {
                files.push(name.to_string_lossy().into_owned());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext == extension)
}

/// List `models_dir` and each of its immediate subdirectories.
///
/// Listing failures are recorded in the result rather than returned.
pub fn list_contents(models_dir: &Path) -> Vec<DirListing> {
    let label = models_dir.display().to_string();
    let top = match sorted_entries(models_dir) {
        Ok(entries) => entries,
        Err(e) => {
            return vec![DirListing {
                label,
                entries: Err(e.to_string()),
            }];
        }
    };

    let mut listings = vec![DirListing {
        label,
        entries: Ok(top.clone()),
    }];

    for name in top {
        let path = models_dir.join(&name);
        if path.is_dir() {
            listings.push(DirListing {
                label: name,
                entries: sorted_entries(&path).map_err(|e| e.to_string()),
            });
        }
    }

    listings
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Every checkpoint file (`.onnx`, `.pkl`) below `models_dir`, relative to it.
pub fn scan_model_files(models_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(models_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            CHECKPOINT_EXTENSIONS
                .iter()
                .any(|ext| has_extension(entry.path(), ext))
        })
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(models_dir)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect();
    files.sort();
    files
}
