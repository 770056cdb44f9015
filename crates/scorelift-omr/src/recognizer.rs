//! The seam between the pipeline and the OMR engine.
//!
//! [`Recognizer`] is the inference entry point. [`OemerRecognizer`] drives
//! the `oemer` command-line tool (or anything with a compatible calling
//! convention) as a subprocess.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::RecognizeError;
use crate::prediction::Prediction;

/// Lines of engine stderr kept in an [`RecognizeError::ExitStatus`].
const STDERR_TAIL_LINES: usize = 20;

/// How long `--help` / `--version` probes may take.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the scratch directory created under the output directory.
pub const WORK_DIR_NAME: &str = ".scorelift-work";

/// Runs recognition over an image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Run inference on `image` using the checkpoints in `models_dir`.
    ///
    /// `Ok(None)` means the engine ran without error but produced nothing.
    async fn infer(
        &self,
        models_dir: &Path,
        image: &Path,
    ) -> Result<Option<Prediction>, RecognizeError>;
}

/// Recognizer backed by an external `oemer`-style program.
#[derive(Debug, Clone)]
pub struct OemerRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    work_root: PathBuf,
    keep_work_dir: bool,
}

impl OemerRecognizer {
    /// Create a recognizer that keeps per-image scratch directories under
    /// `work_root`.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        work_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            work_root: work_root.into(),
            keep_work_dir: false,
        }
    }

    /// Leave the scratch directory of a failed run in place.
    #[must_use]
    pub fn keep_work_dir(mut self, keep: bool) -> Self {
        self.keep_work_dir = keep;
        self
    }

    /// Build from configuration, with scratch space inside `output_dir`.
    pub fn from_config(config: &Config, output_dir: &Path) -> Self {
        Self::new(
            config.engine_program.clone(),
            config.engine_args.clone(),
            config.engine_timeout(),
            output_dir.join(WORK_DIR_NAME),
        )
        .keep_work_dir(config.keep_work_dir)
    }

    /// Scratch directory used for `image`.
    pub fn work_dir_for(&self, image: &Path) -> PathBuf {
        let stem = image
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| OsString::from("image"));
        self.work_root.join(stem)
    }

    fn prepare_work_dir(path: &Path) -> Result<(), RecognizeError> {
        let work_dir_err = |source| RecognizeError::WorkDir {
            path: path.to_path_buf(),
            source,
        };
        if path.exists() {
            std::fs::remove_dir_all(path).map_err(work_dir_err)?;
        }
        std::fs::create_dir_all(path).map_err(work_dir_err)
    }

    /// Run the engine in `work_dir` and collect what it wrote there.
    async fn run_in(
        &self,
        args: Vec<OsString>,
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>, RecognizeError> {
        let output = self.run(args, work_dir).await?;

        forward_output(&output);

        if !output.status.success() {
            return Err(RecognizeError::ExitStatus {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let artifacts = collect_artifacts(work_dir);
        if artifacts.is_empty() {
            log::warn!("{} produced no files in {}", self.program, work_dir.display());
        }
        Ok(artifacts)
    }

    async fn run(&self, args: Vec<OsString>, cwd: &Path) -> Result<Output, RecognizeError> {
        log::info!("Executing: {} {}", self.program, display_args(&args));

        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RecognizeError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the pending future on timeout drops the child, which
        // kills it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| RecognizeError::Launch {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(RecognizeError::Timeout {
                program: self.program.clone(),
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl Recognizer for OemerRecognizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn infer(
        &self,
        models_dir: &Path,
        image: &Path,
    ) -> Result<Option<Prediction>, RecognizeError> {
        let work_dir = self.work_dir_for(image);
        Self::prepare_work_dir(&work_dir)?;
        let work_dir = work_dir
            .canonicalize()
            .map_err(|source| RecognizeError::WorkDir {
                path: work_dir.clone(),
                source,
            })?;

        // The engine runs inside the work directory, so relative paths would
        // no longer resolve.
        let image = absolute(image);
        let models_dir = absolute(models_dir);

        let args = render_args(&self.args, &image, &work_dir, &models_dir);
        let artifacts = match self.run_in(args, &work_dir).await {
            Ok(artifacts) if !artifacts.is_empty() => artifacts,
            outcome => {
                if !self.keep_work_dir {
                    discard_work_dir(&work_dir);
                }
                return outcome.map(|_| None);
            }
        };

        Ok(Some(Prediction::new(image).with_work_dir(work_dir, artifacts)))
    }
}

/// Substitute `{image}`, `{output}` and `{models}` in an argument template.
///
/// An argument that is exactly a placeholder is replaced by the raw path;
/// placeholders embedded in a longer argument are replaced textually.
pub fn render_args(
    template: &[String],
    image: &Path,
    output: &Path,
    models: &Path,
) -> Vec<OsString> {
    let substitutions = [("{image}", image), ("{output}", output), ("{models}", models)];

    template
        .iter()
        .map(|arg| {
            if let Some((_, path)) = substitutions.iter().find(|(key, _)| *key == arg.as_str()) {
                return path.as_os_str().to_os_string();
            }
            let mut rendered = arg.clone();
            for (key, path) in &substitutions {
                if rendered.contains(key) {
                    rendered = rendered.replace(key, &path.to_string_lossy());
                }
            }
            OsString::from(rendered)
        })
        .collect()
}

/// Remove a run's scratch directory, and the shared scratch root once it is
/// empty.
pub(crate) fn discard_work_dir(work_dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(work_dir) {
        log::warn!("Failed to remove work directory {}: {}", work_dir.display(), e);
        return;
    }

    if let Some(root) = work_dir.parent() {
        if root.file_name().is_some_and(|n| n == WORK_DIR_NAME) {
            if let Err(e) = std::fs::remove_dir(root) {
                log::debug!("Keeping {}: {}", root.display(), e);
            }
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn forward_output(output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if !line.trim().is_empty() {
            log::debug!("engine: {}", line.trim());
        }
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        if !line.trim().is_empty() {
            log::warn!("engine: {}", line.trim());
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

fn collect_artifacts(work_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(work_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Whether the engine program is installed and answers `--help` like an OMR
/// tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProbe {
    pub program: String,
    pub installed: bool,
    pub detail: String,
}

/// Run `<program> --help` and check the output looks like the engine's usage.
pub async fn probe_engine(program: &str) -> EngineProbe {
    match run_quick(program, "--help").await {
        Ok(text) => {
            let installed = looks_like_engine_help(&text);
            let detail = if installed {
                "command-line tool is available".to_string()
            } else {
                format!("unexpected --help output: {}", first_line(&text))
            };
            EngineProbe {
                program: program.to_string(),
                installed,
                detail,
            }
        }
        Err(e) => EngineProbe {
            program: program.to_string(),
            installed: false,
            detail: e,
        },
    }
}

/// Run `<program> --version`, if it answers.
pub async fn engine_version(program: &str) -> Option<String> {
    match run_quick(program, "--version").await {
        Ok(text) => {
            let version = first_line(&text);
            (!version.is_empty()).then(|| version.to_string())
        }
        Err(e) => {
            log::warn!("Could not get {program} version: {e}");
            None
        }
    }
}

async fn run_quick(program: &str, flag: &str) -> Result<String, String> {
    let output = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(out)) if out.status.success() => {
            let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&out.stderr));
            Ok(text)
        }
        Ok(Ok(out)) => Err(format!("{program} {flag} exited with {}", out.status)),
        Ok(Err(e)) => Err(format!("failed to run {program}: {e}")),
        Err(_) => Err(format!("{program} {flag} timed out")),
    }
}

fn looks_like_engine_help(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("usage: oemer") || lower.contains("end-to-end omr") || lower.contains("img_path")
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}
