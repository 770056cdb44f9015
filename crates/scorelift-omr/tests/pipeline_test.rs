//! End-to-end tests for `Orchestrator::process_image`.
//!
//! The OMR engine is replaced by a scripted recognizer so the tests exercise
//! the real filesystem checks, conversion chain and output verification
//! without needing the engine or its checkpoints.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use scorelift_core::fallback_musicxml;
use scorelift_omr::convert::{ArtifactScan, EngineOutput, StaticFallback};
use scorelift_omr::recognizer::WORK_DIR_NAME;
use scorelift_omr::{
    Config, ConversionChain, FailureKind, NoProgress, Orchestrator, OutputSink, PipelineEvent,
    Prediction, ProcessError, RecognizeError, Recognizer,
};
use tempfile::TempDir;

/// What the scripted recognizer does when asked to infer.
enum Script {
    /// Write these files into a work dir and return them as artifacts.
    Produce(Vec<(&'static str, &'static str)>),
    /// Return a prediction with no work dir at all.
    Bare,
    Nothing,
    Fail,
}

struct ScriptedRecognizer {
    script: Script,
    work_dir: PathBuf,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    fn new(script: Script, work_dir: PathBuf) -> Self {
        Self {
            script,
            work_dir,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn infer(
        &self,
        _models_dir: &Path,
        image: &Path,
    ) -> Result<Option<Prediction>, RecognizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Produce(files) => {
                fs::create_dir_all(&self.work_dir).unwrap();
                let artifacts = files
                    .iter()
                    .map(|(name, body)| {
                        let path = self.work_dir.join(name);
                        fs::write(&path, body).unwrap();
                        path
                    })
                    .collect();
                Ok(Some(Prediction::new(image).with_work_dir(&self.work_dir, artifacts)))
            }
            Script::Bare => Ok(Some(Prediction::new(image).with_shape(vec![1, 512, 512]))),
            Script::Nothing => Ok(None),
            Script::Fail => Err(RecognizeError::ExitStatus {
                program: "scripted".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "staff detection failed".to_string(),
            }),
        }
    }
}

/// Writes, then removes the file before anyone can look at it.
struct VanishingSink;

impl OutputSink for VanishingSink {
    fn write(&self, path: &Path, content: &str) -> std::io::Result<()> {
        fs::write(path, content)?;
        fs::remove_file(path)
    }
}

/// Reports success without writing anything.
struct EmptySink;

impl OutputSink for EmptySink {
    fn write(&self, path: &Path, _content: &str) -> std::io::Result<()> {
        fs::write(path, "")
    }
}

struct Fixture {
    _temp_dir: TempDir,
    image: PathBuf,
    models_dir: PathBuf,
    output_dir: PathBuf,
    work_dir: PathBuf,
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();

    let image = root.join("nocturne.png");
    fs::write(&image, b"\x89PNG fake").unwrap();

    let models_dir = root.join("checkpoints");
    fs::create_dir_all(models_dir.join("unet_big")).unwrap();
    fs::write(models_dir.join("unet_big").join("model.onnx"), b"weights").unwrap();

    Fixture {
        image,
        models_dir,
        output_dir: root.join("out"),
        work_dir: root.join("work"),
        _temp_dir: temp_dir,
    }
}

fn orchestrator(fx: &Fixture, script: Script) -> Orchestrator {
    Orchestrator::new(
        Box::new(ScriptedRecognizer::new(script, fx.work_dir.clone())),
        ConversionChain::default(),
    )
    .with_models(
        fx.models_dir.clone(),
        vec!["unet_big".to_string(), "seg_net".to_string()],
        "onnx",
    )
}

const ENGINE_XML: &str = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part id="P1">
    <measure number="1">
      <attributes><clef><sign>G</sign><line>2</line></clef></attributes>
      <note><pitch><step>E</step><octave>5</octave></pitch><duration>1</duration></note>
      <note><pitch><step>D</step><octave>5</octave></pitch><duration>1</duration></note>
    </measure>
  </part>
</score-partwise>"#;

#[tokio::test]
async fn test_engine_output_is_written() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Produce(vec![("nocturne.musicxml", ENGINE_XML)]));
    let mut events: Vec<PipelineEvent> = Vec::new();

    let score = orch
        .process_image(&fx.image, &fx.output_dir, &mut events)
        .await
        .unwrap();

    assert_eq!(score.path, fx.output_dir.join("nocturne.xml"));
    assert_eq!(score.strategy, EngineOutput::NAME);
    assert!(!score.used_fallback());
    assert_eq!(fs::read_to_string(&score.path).unwrap(), ENGINE_XML);
    assert_eq!(score.bytes, ENGINE_XML.len() as u64);

    let summary = score.summary.unwrap();
    assert_eq!(summary.notes, 2);
    assert_eq!(summary.measures, 1);

    assert!(events.contains(&PipelineEvent::BuildingMusicXml));
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::ModelFound { subdir, .. } if subdir == "unet_big")));
}

#[tokio::test]
async fn test_work_dir_is_removed_after_conversion() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Produce(vec![("nocturne.musicxml", ENGINE_XML)]));

    orch.process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap();
    assert!(!fx.work_dir.exists());
}

#[tokio::test]
async fn test_work_dir_kept_on_request() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Produce(vec![("nocturne.musicxml", ENGINE_XML)]))
        .keep_work_dir(true);

    orch.process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap();
    assert!(fx.work_dir.join("nocturne.musicxml").exists());
}

#[tokio::test]
async fn test_alternate_artifact_is_used() {
    let fx = fixture();
    let orch = orchestrator(
        &fx,
        Script::Produce(vec![("enhanced_nocturne.musicxml", ENGINE_XML)]),
    );
    let mut events: Vec<PipelineEvent> = Vec::new();

    let score = orch
        .process_image(&fx.image, &fx.output_dir, &mut events)
        .await
        .unwrap();

    assert_eq!(score.strategy, ArtifactScan::NAME);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::StrategySkipped { strategy, .. } if strategy == EngineOutput::NAME
    )));
}

#[tokio::test]
async fn test_fallback_document_written_exactly() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Bare);
    let mut events: Vec<PipelineEvent> = Vec::new();

    let score = orch
        .process_image(&fx.image, &fx.output_dir, &mut events)
        .await
        .unwrap();

    assert!(score.used_fallback());
    assert_eq!(score.strategy, StaticFallback::NAME);
    assert_eq!(fs::read_to_string(&score.path).unwrap(), fallback_musicxml());
    assert!(events.contains(&PipelineEvent::UsingFallback));
    assert!(events.contains(&PipelineEvent::InferenceCompleted {
        description: "shape (1, 512, 512)".to_string()
    }));
}

#[tokio::test]
async fn test_missing_image() {
    let fx = fixture();
    let recognizer = ScriptedRecognizer::new(Script::Bare, fx.work_dir.clone());
    let missing = fx.image.with_file_name("missing.png");

    let orch = Orchestrator::new(Box::new(recognizer), ConversionChain::default()).with_models(
        fx.models_dir.clone(),
        vec!["unet_big".to_string()],
        "onnx",
    );

    let err = orch
        .process_image(&missing, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::MissingInput);
    assert!(err.to_string().contains("not found"));
    assert!(!fx.output_dir.join("missing.xml").exists());
}

#[tokio::test]
async fn test_missing_models_dir() {
    let fx = fixture();
    fs::remove_dir_all(&fx.models_dir).unwrap();
    let orch = orchestrator(&fx, Script::Bare);

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::MissingModelDir);
    assert!(!fx.output_dir.exists());
}

#[tokio::test]
async fn test_no_model_files_emits_listing() {
    let fx = fixture();
    fs::remove_file(fx.models_dir.join("unet_big").join("model.onnx")).unwrap();
    fs::write(fx.models_dir.join("unet_big").join("weights.bin"), b"w").unwrap();
    let orch = orchestrator(&fx, Script::Bare);
    let mut events: Vec<PipelineEvent> = Vec::new();

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut events)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NoModelFiles);
    let listings: Vec<String> = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::ModelListing(_)))
        .map(ToString::to_string)
        .collect();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[1], "Contents of unet_big: [weights.bin]");
}

#[tokio::test]
async fn test_inference_returning_nothing() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Nothing);

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::InferenceEmpty);
}

#[tokio::test]
async fn test_inference_error_is_distinct() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Fail);

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Inference);
    assert!(matches!(err, ProcessError::Inference(RecognizeError::ExitStatus { .. })));
}

/// Configuration that runs `script` under `sh` as the engine.
#[cfg(unix)]
fn shell_config(fx: &Fixture, script: &str) -> Config {
    Config {
        models_dir: fx.models_dir.clone(),
        engine_program: "sh".to_string(),
        engine_args: vec![
            "-c".to_string(),
            script.to_string(),
            "engine".to_string(),
            "{output}".to_string(),
        ],
        ..Config::default()
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_engine_leaves_no_scratch_dir() {
    let fx = fixture();
    let config = shell_config(&fx, r#"touch "$1/staff.png"; exit 2"#);
    let orch = Orchestrator::from_config(&config, &fx.output_dir).unwrap();

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Inference);
    assert!(!fx.output_dir.join(WORK_DIR_NAME).exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_subprocess_engine_output_is_written() {
    let fx = fixture();
    let config = shell_config(&fx, r#"echo "<score-partwise/>" > "$1/nocturne.musicxml""#);
    let orch = Orchestrator::from_config(&config, &fx.output_dir).unwrap();

    let score = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap();

    assert_eq!(score.path, fx.output_dir.join("nocturne.xml"));
    assert_eq!(score.strategy, EngineOutput::NAME);
    assert!(!fx.output_dir.join(WORK_DIR_NAME).exists());
}

#[tokio::test]
async fn test_exhausted_chain() {
    let fx = fixture();
    let chain = ConversionChain::from_names(&[EngineOutput::NAME.to_string()]).unwrap();
    let orch = Orchestrator::new(
        Box::new(ScriptedRecognizer::new(Script::Bare, fx.work_dir.clone())),
        chain,
    )
    .with_models(fx.models_dir.clone(), vec!["unet_big".to_string()], "onnx");

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    match err {
        ProcessError::ConversionExhausted { attempts } => assert_eq!(attempts.len(), 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_engine_output_fails() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Produce(vec![("nocturne.musicxml", "")]));

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProcessError::ConversionEmpty { ref strategy } if strategy == EngineOutput::NAME
    ));
    assert!(!fx.output_dir.join("nocturne.xml").exists());
}

#[tokio::test]
async fn test_vanished_output_is_a_failure() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Bare).with_sink(Box::new(VanishingSink));

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::WriteFailed);
}

#[tokio::test]
async fn test_empty_output_is_a_failure() {
    let fx = fixture();
    let orch = orchestrator(&fx, Script::Bare).with_sink(Box::new(EmptySink));

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::OutputEmpty);
}

#[tokio::test]
async fn test_precondition_failure_skips_inference() {
    let fx = fixture();
    fs::remove_dir_all(&fx.models_dir).unwrap();
    let recognizer = Arc::new(ScriptedRecognizer::new(Script::Bare, fx.work_dir.clone()));

    let orch = Orchestrator::new(
        Box::new(SharedRecognizer(Arc::clone(&recognizer))),
        ConversionChain::default(),
    )
    .with_models(fx.models_dir.clone(), vec!["unet_big".to_string()], "onnx");

    let err = orch
        .process_image(&fx.image, &fx.output_dir, &mut NoProgress)
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
}

struct SharedRecognizer(Arc<ScriptedRecognizer>);

#[async_trait]
impl Recognizer for SharedRecognizer {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn infer(
        &self,
        models_dir: &Path,
        image: &Path,
    ) -> Result<Option<Prediction>, RecognizeError> {
        self.0.infer(models_dir, image).await
    }
}
