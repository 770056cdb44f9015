use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for scorelift.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (SCORELIFT_* prefix)
/// 3. Config file (~/.config/scorelift/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding the engine's pretrained checkpoints.
    ///
    /// Can be set via:
    /// - ENV: SCORELIFT_MODELS_DIR
    /// - Config: models_dir = "/path/to/checkpoints"
    /// - Default: ~/.local/share/scorelift/checkpoints
    pub models_dir: PathBuf,

    /// Subdirectories of `models_dir` that are expected to hold a model.
    /// At least one of them must contain a model file.
    pub model_subdirs: Vec<String>,

    /// File extension (without the dot) that marks a model file.
    pub model_extension: String,

    /// Program invoked to run recognition.
    pub engine_program: String,

    /// Argument template for `engine_program`. `{image}`, `{output}` and
    /// `{models}` are replaced with the input image, the engine's work
    /// directory and `models_dir`.
    pub engine_args: Vec<String>,

    /// Seconds the engine may run before it is killed.
    pub engine_timeout_secs: u64,

    /// Conversion strategies, tried in order until one produces MusicXML.
    pub strategies: Vec<String>,

    /// Keep the engine's work directory after a run.
    pub keep_work_dir: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            model_subdirs: vec!["unet_big".to_string(), "seg_net".to_string()],
            model_extension: "onnx".to_string(),
            engine_program: "oemer".to_string(),
            engine_args: vec![
                "{image}".to_string(),
                "-o".to_string(),
                "{output}".to_string(),
                "--without-deskew".to_string(),
            ],
            engine_timeout_secs: 30 * 60,
            strategies: vec![
                "engine-output".to_string(),
                "artifact-scan".to_string(),
                "fallback".to_string(),
            ],
            keep_work_dir: false,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/scorelift/config.toml
    /// Reads environment variables with SCORELIFT_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from an explicit file path.
    ///
    /// This is used when the --config CLI flag is provided. A missing file is
    /// not an error; defaults and the environment still apply.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("scorelift");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// The engine timeout as a [`Duration`].
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }
}

/// Get the default checkpoints directory.
///
/// Returns: ~/.local/share/scorelift/checkpoints (or platform equivalent)
fn default_models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scorelift")
        .join("checkpoints")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/scorelift/config.toml
/// - macOS: ~/Library/Application Support/scorelift/config.toml
/// - Windows: %APPDATA%\scorelift\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scorelift")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Scorelift Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (SCORELIFT_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Directory holding the OMR engine's pretrained checkpoints.
# Each entry of model_subdirs is looked up beneath it.
#
# Can also be set via:
# - Environment: SCORELIFT_MODELS_DIR=/path/to/checkpoints
#models_dir = "/path/to/checkpoints"

# Checkpoint subdirectories; at least one must hold a model file.
model_subdirs = ["unet_big", "seg_net"]
model_extension = "onnx"

# The recognition engine and its argument template.
# {image}, {output} and {models} are substituted per run.
engine_program = "oemer"
engine_args = ["{image}", "-o", "{output}", "--without-deskew"]
engine_timeout_secs = 1800

# Ways of turning the engine's result into MusicXML, tried in order:
# - engine-output: the <image>.musicxml file the engine writes
# - artifact-scan: any other MusicXML file the engine left behind
# - fallback:      a fixed one-note score
strategies = ["engine-output", "artifact-scan", "fallback"]

# Keep the engine's scratch directory (<output_dir>/.scorelift-work) after a run.
keep_work_dir = false
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
