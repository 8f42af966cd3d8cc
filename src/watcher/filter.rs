//! Screening of raw creation events into conversion jobs.
//!
//! The rules encode the operator-facing naming convention: only plain files
//! whose name carries the required prefix and the structured-input extension
//! qualify, and files already in the final format never do, so the pipeline
//! cannot react to its own output.

use std::fmt;
use std::path::{Path, PathBuf};

/// One accepted creation event, ready for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// The detected source file.
    pub source: PathBuf,
    /// Its parent directory; the final artifact lands here.
    pub directory: PathBuf,
}

impl JobSpec {
    /// Derive the output path: same directory and base name as the source,
    /// with the given final-format extension.
    pub fn output_path(&self, final_extension: &str) -> PathBuf {
        self.source.with_extension(final_extension)
    }
}

/// Why an event was not turned into a job.
///
/// Not an error. Every variant is a silent skip, at most worth a debug line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// The event refers to a directory.
    Directory,
    /// The file already carries the final-format extension.
    FinalFormat,
    /// The extension is not the structured-input extension.
    WrongExtension,
    /// The name does not start with the required prefix.
    MissingPrefix,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Skip::Directory => "directory",
            Skip::FinalFormat => "already final format",
            Skip::WrongExtension => "extension mismatch",
            Skip::MissingPrefix => "prefix mismatch",
        };
        f.write_str(reason)
    }
}

/// Ordered predicate chain from a creation event to a job spec.
///
/// Pure and free of I/O; the caller resolves whether the event refers to a
/// directory. Extension comparisons are ASCII case-insensitive, the prefix
/// comparison is case-sensitive.
#[derive(Debug, Clone)]
pub struct EventFilter {
    prefix: String,
    input_extension: String,
    final_extension: String,
}

impl EventFilter {
    /// Build a filter for the given convention. Extensions may be written
    /// with or without a leading dot.
    pub fn new(prefix: &str, input_extension: &str, final_extension: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            input_extension: normalize(input_extension),
            final_extension: normalize(final_extension),
        }
    }

    /// Evaluate the rules in order and produce a job spec on acceptance.
    pub fn evaluate(&self, path: &Path, is_directory: bool) -> Result<JobSpec, Skip> {
        if is_directory {
            return Err(Skip::Directory);
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        if extension.as_deref() == Some(self.final_extension.as_str()) {
            return Err(Skip::FinalFormat);
        }
        if extension.as_deref() != Some(self.input_extension.as_str()) {
            return Err(Skip::WrongExtension);
        }

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !name.starts_with(&self.prefix) {
            return Err(Skip::MissingPrefix);
        }

        Ok(JobSpec {
            source: path.to_path_buf(),
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        })
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}
