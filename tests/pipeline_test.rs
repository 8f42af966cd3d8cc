//! Pipeline behavior with scripted converter stages.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docwatch::convert::{Assembler, ConvertError, Formatter, FormatterOutput};
use docwatch::pipeline::{ConversionPipeline, PipelineError};
use docwatch::watcher::{EventFilter, JobSpec};
use tempfile::TempDir;

/// Stage-1 stand-in. Records every intermediate path it is handed and, on
/// success, writes a transformed copy of the source into it.
struct ScriptedFormatter {
    fail: bool,
    intermediates: Mutex<Vec<PathBuf>>,
}

impl ScriptedFormatter {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            intermediates: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            intermediates: Mutex::new(Vec::new()),
        })
    }

    fn intermediates(&self) -> Vec<PathBuf> {
        self.intermediates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Formatter for ScriptedFormatter {
    async fn format(
        &self,
        input: &Path,
        _format: &str,
        output: &Path,
    ) -> Result<FormatterOutput, ConvertError> {
        self.intermediates.lock().unwrap().push(output.to_path_buf());

        if self.fail {
            return Err(ConvertError::ExitStatus {
                program: "scripted".to_string(),
                status: failure_status(),
                stderr: "malformed document".to_string(),
            });
        }

        let source = std::fs::read_to_string(input)?;
        std::fs::write(output, format!("converted: {source}"))?;
        Ok(FormatterOutput::default())
    }
}

#[cfg(unix)]
fn failure_status() -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(256)
}

#[cfg(not(unix))]
fn failure_status() -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(1)
}

enum AssembleMode {
    Ok,
    Diagnostics,
    Error,
}

/// Stage-2 stand-in with three scripted outcomes.
struct ScriptedAssembler {
    mode: AssembleMode,
}

impl Assembler for ScriptedAssembler {
    fn assemble(&self, intermediate: &Path, output: &Path) -> Result<String, ConvertError> {
        match self.mode {
            AssembleMode::Ok => {
                let body = std::fs::read_to_string(intermediate)?;
                std::fs::write(output, body)?;
                Ok(String::new())
            }
            AssembleMode::Diagnostics => Ok("reference template not found".to_string()),
            AssembleMode::Error => Err(ConvertError::Io(std::io::Error::other(
                "output file locked",
            ))),
        }
    }
}

fn pipeline(formatter: Arc<ScriptedFormatter>, mode: AssembleMode) -> ConversionPipeline {
    ConversionPipeline::new(
        formatter,
        Arc::new(ScriptedAssembler { mode }),
        "md",
        "docx",
    )
}

fn write_source(dir: &Path, name: &str, content: &str) -> JobSpec {
    let source = dir.join(name);
    std::fs::write(&source, content).unwrap();
    JobSpec {
        source,
        directory: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn successful_job_writes_output_and_removes_the_intermediate() {
    let dir = TempDir::new().unwrap();

    // The full acceptance path: the filter produces the spec the pipeline runs.
    let filter = EventFilter::new("config-", "xml", "docx");
    std::fs::write(dir.path().join("config-alpha.xml"), "<doc/>").unwrap();
    let spec = filter
        .evaluate(&dir.path().join("config-alpha.xml"), false)
        .unwrap();

    let formatter = ScriptedFormatter::ok();
    let output = pipeline(Arc::clone(&formatter), AssembleMode::Ok)
        .run(&spec)
        .await
        .unwrap();

    assert_eq!(output, dir.path().join("config-alpha.docx"));
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "converted: <doc/>"
    );

    let intermediates = formatter.intermediates();
    assert_eq!(intermediates.len(), 1);
    assert!(!intermediates[0].exists(), "intermediate file must be removed");
}

#[tokio::test]
async fn stage1_failure_aborts_before_any_output() {
    let dir = TempDir::new().unwrap();
    let spec = write_source(dir.path(), "config-beta.xml", "<doc/>");

    let formatter = ScriptedFormatter::failing();
    let result = pipeline(Arc::clone(&formatter), AssembleMode::Ok)
        .run(&spec)
        .await;

    match result {
        Err(PipelineError::StageOne(ConvertError::ExitStatus { stderr, .. })) => {
            assert_eq!(stderr, "malformed document");
        }
        other => panic!("expected a stage-1 failure, got {other:?}"),
    }

    assert!(!dir.path().join("config-beta.docx").exists());
    assert!(!formatter.intermediates()[0].exists());
}

#[tokio::test]
async fn stage2_error_aborts_and_still_cleans_up() {
    let dir = TempDir::new().unwrap();
    let spec = write_source(dir.path(), "config-gamma.xml", "<doc/>");

    let formatter = ScriptedFormatter::ok();
    let result = pipeline(Arc::clone(&formatter), AssembleMode::Error)
        .run(&spec)
        .await;

    assert!(matches!(result, Err(PipelineError::StageTwo(_))));
    assert!(!dir.path().join("config-gamma.docx").exists());
    assert!(!formatter.intermediates()[0].exists());
}

#[tokio::test]
async fn nonempty_diagnostics_fail_stage2() {
    let dir = TempDir::new().unwrap();
    let spec = write_source(dir.path(), "config-delta.xml", "<doc/>");

    let formatter = ScriptedFormatter::ok();
    let result = pipeline(Arc::clone(&formatter), AssembleMode::Diagnostics)
        .run(&spec)
        .await;

    match result {
        Err(PipelineError::StageTwo(ConvertError::Diagnostics(text))) => {
            assert_eq!(text, "reference template not found");
        }
        other => panic!("expected stage-2 diagnostics, got {other:?}"),
    }
    assert!(!dir.path().join("config-delta.docx").exists());
    assert!(!formatter.intermediates()[0].exists());
}

#[tokio::test]
async fn rerun_overwrites_the_previous_output() {
    let dir = TempDir::new().unwrap();
    let formatter = ScriptedFormatter::ok();
    let pipeline = pipeline(Arc::clone(&formatter), AssembleMode::Ok);

    let spec = write_source(dir.path(), "config-epsilon.xml", "first");
    pipeline.run(&spec).await.unwrap();

    std::fs::write(&spec.source, "second").unwrap();
    let output = pipeline.run(&spec).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "converted: second"
    );
    // No temp accumulation: every allocated intermediate is gone.
    for intermediate in formatter.intermediates() {
        assert!(!intermediate.exists());
    }
}

#[tokio::test]
async fn concurrent_jobs_use_distinct_intermediates() {
    let dir = TempDir::new().unwrap();
    let formatter = ScriptedFormatter::ok();
    let pipeline = Arc::new(pipeline(Arc::clone(&formatter), AssembleMode::Ok));

    let first = write_source(dir.path(), "config-one.xml", "1");
    let second = write_source(dir.path(), "config-two.xml", "2");

    let (a, b) = tokio::join!(pipeline.run(&first), pipeline.run(&second));
    a.unwrap();
    b.unwrap();

    let intermediates = formatter.intermediates();
    assert_eq!(intermediates.len(), 2);
    assert_ne!(intermediates[0], intermediates[1]);
}

/// Stage-1 stand-in that deletes the job's directory after reading the
/// source, forcing the pipeline to recreate it for the output.
struct DirRemovingFormatter;

#[async_trait]
impl Formatter for DirRemovingFormatter {
    async fn format(
        &self,
        input: &Path,
        _format: &str,
        output: &Path,
    ) -> Result<FormatterOutput, ConvertError> {
        let source = std::fs::read_to_string(input)?;
        std::fs::write(output, source)?;
        std::fs::remove_dir_all(input.parent().unwrap())?;
        Ok(FormatterOutput::default())
    }
}

#[tokio::test]
async fn missing_output_directory_is_recreated_before_stage2() {
    let root = TempDir::new().unwrap();
    let sub = root.path().join("incoming");
    std::fs::create_dir(&sub).unwrap();
    let spec = write_source(&sub, "config-zeta.xml", "<doc/>");

    let pipeline = ConversionPipeline::new(
        Arc::new(DirRemovingFormatter),
        Arc::new(ScriptedAssembler {
            mode: AssembleMode::Ok,
        }),
        "md",
        "docx",
    );

    let output = pipeline.run(&spec).await.unwrap();

    assert!(sub.exists(), "output directory must be recreated");
    assert!(output.exists());
}
