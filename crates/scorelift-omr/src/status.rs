//! Readiness report for the recognition environment.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::models;
use crate::recognizer::{engine_version, probe_engine};

/// Whether the engine and its checkpoints are in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentStatus {
    pub engine_program: String,
    pub engine_installed: bool,
    pub engine_detail: String,
    pub engine_version: Option<String>,
    pub models_dir: PathBuf,
    pub models_dir_exists: bool,
    /// Checkpoint files below `models_dir`, relative to it.
    pub model_files: Vec<PathBuf>,
    /// Configured subdirectories that hold a model with the configured
    /// extension.
    pub usable_subdirs: Vec<String>,
}

impl EnvironmentStatus {
    /// Ready when the engine answers and at least one expected model
    /// subdirectory is populated.
    pub fn ready(&self) -> bool {
        self.engine_installed && !self.usable_subdirs.is_empty()
    }
}

/// Probe the engine program and inspect the models directory.
pub async fn check_environment(config: &Config) -> EnvironmentStatus {
    let probe = probe_engine(&config.engine_program).await;
    let version = if probe.installed {
        engine_version(&config.engine_program).await
    } else {
        None
    };

    let (models_dir_exists, model_files, usable_subdirs) = inspect_models(config);

    EnvironmentStatus {
        engine_program: probe.program,
        engine_installed: probe.installed,
        engine_detail: probe.detail,
        engine_version: version,
        models_dir: config.models_dir.clone(),
        models_dir_exists,
        model_files,
        usable_subdirs,
    }
}

fn inspect_models(config: &Config) -> (bool, Vec<PathBuf>, Vec<String>) {
    let models_dir = config.models_dir.as_path();
    if !models_dir.exists() {
        return (false, Vec::new(), Vec::new());
    }

    let files = models::scan_model_files(models_dir);
    let usable = match models::inspect(models_dir, &config.model_subdirs, &config.model_extension) {
        Ok(inventory) => inventory.found_names().into_iter().map(String::from).collect(),
        Err(e) => {
            log::debug!("Model check: {e}");
            Vec::new()
        }
    };

    (true, files, usable)
}
