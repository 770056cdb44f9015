use std::path::{Path, PathBuf};

use scorelift_core::protocol::traceback;
use scorelift_core::Sentinel;
use scorelift_omr::{
    Config, Orchestrator, PipelineEvent, ProcessError, ProcessedScore, ProgressSink,
};

/// Prints each pipeline event as an informational stdout line.
#[derive(Debug, Default)]
struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn emit(&mut self, event: PipelineEvent) {
        println!("{event}");
    }
}

/// Process one image and report the outcome on stdout.
///
/// Returns `true` when a score was written and verified.
pub async fn run_process(
    image: PathBuf,
    output_dir: PathBuf,
    config_path: Option<PathBuf>,
) -> bool {
    println!("Starting OMR processing...");
    println!("Input: {}", image.display());
    println!("Output directory: {}", output_dir.display());

    match process(&image, &output_dir, config_path.as_deref()).await {
        Ok(score) => {
            for line in success_lines(&score) {
                println!("{line}");
            }
            true
        }
        Err(err) => {
            if err.is_precondition() {
                log::error!("{}: {} (engine not started)", err.kind().code(), err);
            } else {
                log::error!("{}: {}", err.kind().code(), err);
            }
            for line in failure_lines(&err) {
                println!("{line}");
            }
            false
        }
    }
}

async fn process(
    image: &Path,
    output_dir: &Path,
    config_path: Option<&Path>,
) -> Result<ProcessedScore, ProcessError> {
    let config = match config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| ProcessError::Config(format!("{e:#}")))?;

    let orchestrator = Orchestrator::from_config(&config, output_dir)?;
    log::debug!("{orchestrator:?}");

    orchestrator
        .process_image(image, output_dir, &mut StdoutProgress)
        .await
}

fn success_lines(score: &ProcessedScore) -> Vec<String> {
    let path = score.path.display();
    vec![
        Sentinel::Success.line(&path),
        format!("Output file size: {} bytes", score.bytes),
        Sentinel::Completed.line(&path),
    ]
}

fn failure_lines(err: &ProcessError) -> Vec<String> {
    let mut trace = traceback(err);
    if let ProcessError::ConversionExhausted { attempts } = err {
        for attempt in attempts {
            trace.push_str("\n  tried ");
            trace.push_str(&attempt.to_string());
        }
    }

    vec![
        Sentinel::Error.line(err),
        Sentinel::Traceback.line(trace),
        Sentinel::Error.line("Processing failed"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorelift_omr::{ConversionError, RecognizeError};

    #[test]
    fn test_success_lines() {
        let score = ProcessedScore {
            path: PathBuf::from("/out/prelude.xml"),
            bytes: 1024,
            strategy: "engine-output".to_string(),
            summary: None,
        };
        assert_eq!(
            success_lines(&score),
            vec![
                "SUCCESS:/out/prelude.xml",
                "Output file size: 1024 bytes",
                "COMPLETED:/out/prelude.xml",
            ]
        );
    }

    #[test]
    fn test_failure_lines_are_sentinels() {
        let err = ProcessError::MissingInput {
            path: PathBuf::from("missing.png"),
        };
        let lines = failure_lines(&err);

        assert_eq!(lines[0], "ERROR:Input image file not found: missing.png");
        assert_eq!(lines[2], "ERROR:Processing failed");
        assert!(lines[1].starts_with(Sentinel::Traceback.prefix()));
    }

    #[test]
    fn test_traceback_includes_engine_stderr() {
        let err = ProcessError::from(RecognizeError::ExitStatus {
            program: "oemer".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "ValueError: no staff found".to_string(),
        });
        let lines = failure_lines(&err);
        assert!(lines[1].contains("ValueError: no staff found"));
    }

    #[test]
    fn test_traceback_lists_attempts() {
        let err = ProcessError::ConversionExhausted {
            attempts: vec![ConversionError::Unavailable {
                strategy: "engine-output".to_string(),
                reason: "page.musicxml not found".to_string(),
            }],
        };
        let lines = failure_lines(&err);
        assert!(lines[1].contains("tried engine-output unavailable: page.musicxml not found"));
    }
}
