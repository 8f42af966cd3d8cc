//! External formatter invocation.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::{ConvertError, Formatter, FormatterOutput};

/// Runs the configured formatter program as a child process.
///
/// The program is invoked with an argument vector, never through a shell,
/// so paths containing spaces or quoting-sensitive characters pass through
/// intact:
///
/// ```text
/// <program> -i <input> -f <format> -o <output>
/// ```
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
}

impl CommandFormatter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Formatter for CommandFormatter {
    async fn format(
        &self,
        input: &Path,
        format: &str,
        output: &Path,
    ) -> Result<FormatterOutput, ConvertError> {
        tracing::debug!(
            "[stage1] running: {} -i {} -f {format} -o {}",
            self.program,
            input.display(),
            output.display()
        );

        let result = Command::new(&self.program)
            .arg("-i")
            .arg(input)
            .arg("-f")
            .arg(format)
            .arg("-o")
            .arg(output)
            .output()
            .await
            .map_err(|e| ConvertError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&result.stderr).into_owned();

        if !result.status.success() {
            return Err(ConvertError::ExitStatus {
                program: self.program.clone(),
                status: result.status,
                stderr,
            });
        }

        Ok(FormatterOutput { stdout, stderr })
    }
}
