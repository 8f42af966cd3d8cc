//! The two-stage conversion pipeline.
//!
//! One [`ConversionPipeline::run`] call is one job: allocate the
//! intermediate file, run stage 1 (the external formatter), make sure the
//! output directory exists, run stage 2 (the in-process assembler), then
//! delete the intermediate file. Cleanup runs on every exit path once
//! allocation succeeded, and a cleanup failure never overrides the job's
//! outcome.

mod temp;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::convert::{Assembler, ConvertError, Formatter};
use crate::watcher::JobSpec;

pub use temp::IntermediateFile;

/// A job failure, tagged with the stage that caused it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to allocate intermediate file: {0}")]
    TempAllocation(#[source] io::Error),

    #[error(transparent)]
    StageOne(ConvertError),

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    StageTwo(ConvertError),
}

impl PipelineError {
    /// Name of the failing stage, for terminal log records.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::TempAllocation(_) => "temp allocation",
            PipelineError::StageOne(_) => "stage 1 (format)",
            PipelineError::OutputDir { .. } => "output directory creation",
            PipelineError::StageTwo(_) => "stage 2 (assemble)",
        }
    }
}

/// Drives a single conversion job through both stages.
///
/// Holds no mutable state; one instance is shared across all concurrently
/// running jobs.
pub struct ConversionPipeline {
    formatter: Arc<dyn Formatter>,
    assembler: Arc<dyn Assembler>,
    intermediate_format: String,
    final_extension: String,
}

impl ConversionPipeline {
    pub fn new(
        formatter: Arc<dyn Formatter>,
        assembler: Arc<dyn Assembler>,
        intermediate_format: impl Into<String>,
        final_extension: impl Into<String>,
    ) -> Self {
        Self {
            formatter,
            assembler,
            intermediate_format: intermediate_format.into(),
            final_extension: final_extension.into(),
        }
    }

    /// Run one job to completion, returning the path of the final artifact.
    ///
    /// The intermediate file is removed before returning, whatever the
    /// outcome of the stages.
    pub async fn run(&self, job: &JobSpec) -> Result<PathBuf, PipelineError> {
        let intermediate = IntermediateFile::allocate(&self.intermediate_format)
            .map_err(PipelineError::TempAllocation)?;
        tracing::debug!(
            "[pipeline] intermediate file: {}",
            intermediate.path().display()
        );

        let result = self.convert(job, intermediate.path()).await;
        intermediate.remove();
        result
    }

    async fn convert(&self, job: &JobSpec, intermediate: &Path) -> Result<PathBuf, PipelineError> {
        let streams = self
            .formatter
            .format(&job.source, &self.intermediate_format, intermediate)
            .await
            .map_err(PipelineError::StageOne)?;

        if !streams.stdout.trim().is_empty() {
            tracing::debug!("[stage1] output: {}", streams.stdout.trim_end());
        }
        if !streams.stderr.trim().is_empty() {
            // Noisy but successful: the exit status alone decided the outcome.
            tracing::error!("[stage1] diagnostics: {}", streams.stderr.trim_end());
        }

        let output = job.output_path(&self.final_extension);
        if let Some(parent) = output.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| PipelineError::OutputDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
                tracing::info!("[pipeline] created output directory {}", parent.display());
            }
        }

        let diagnostics = self
            .assembler
            .assemble(intermediate, &output)
            .map_err(PipelineError::StageTwo)?;
        if !diagnostics.is_empty() {
            return Err(PipelineError::StageTwo(ConvertError::Diagnostics(
                diagnostics,
            )));
        }

        Ok(output)
    }
}
