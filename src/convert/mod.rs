//! Conversion stage contracts.
//!
//! The two stages are opaque engines behind narrow seams: stage 1 turns the
//! structured source into an intermediate document out of process, stage 2
//! assembles the intermediate document into the final artifact in process.
//! Implementations signal failure through [`ConvertError`]; stage 2
//! additionally returns diagnostic text, where anything non-empty means the
//! conversion did not succeed.

mod command;
mod markdown;

use std::io;
use std::path::Path;
use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;

pub use command::CommandFormatter;
pub use markdown::MarkdownAssembler;

/// Errors from either conversion stage.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The external converter could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The external converter ran but signalled failure.
    #[error("`{program}` exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// An in-process converter reported a non-empty diagnostic.
    #[error("converter diagnostics: {0}")]
    Diagnostics(String),

    /// Reading or writing a document failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Captured output streams of a stage-1 run.
#[derive(Debug, Default)]
pub struct FormatterOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Stage 1: structured source to intermediate document, out of process.
#[async_trait]
pub trait Formatter: Send + Sync {
    /// Convert `input` into `output` in the given intermediate format.
    ///
    /// Both streams of the external process are captured and returned. A
    /// noisy stderr alone is not a failure; only how the process exited
    /// decides the outcome.
    async fn format(
        &self,
        input: &Path,
        format: &str,
        output: &Path,
    ) -> Result<FormatterOutput, ConvertError>;
}

/// Stage 2: intermediate document to final artifact, in process.
pub trait Assembler: Send + Sync {
    /// Assemble `intermediate` into `output`, returning diagnostic text.
    /// Empty diagnostics mean success.
    fn assemble(&self, intermediate: &Path, output: &Path) -> Result<String, ConvertError>;
}
