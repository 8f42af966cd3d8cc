//! Temporary intermediate files.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// A uniquely named intermediate file for one conversion job.
///
/// The file is filesystem-visible from allocation until [`remove`] is
/// called, with drop of the inner handle as a backstop. Names never collide
/// across concurrent jobs.
///
/// [`remove`]: IntermediateFile::remove
#[derive(Debug)]
pub struct IntermediateFile {
    path: TempPath,
}

impl IntermediateFile {
    /// Allocate an empty intermediate file carrying the given format as its
    /// extension.
    pub fn allocate(format: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("docwatch-")
            .suffix(&format!(".{format}"))
            .tempfile()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. A failure is logged and swallowed: cleanup must not
    /// mask the outcome of the job that used the file.
    pub fn remove(self) {
        let location: PathBuf = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => {
                tracing::debug!("[pipeline] deleted intermediate file {}", location.display());
            }
            Err(e) => {
                tracing::warn!(
                    "[pipeline] failed to delete intermediate file {}: {e}",
                    location.display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_creates_a_visible_file_with_the_format_extension() {
        let file = IntermediateFile::allocate("md").unwrap();

        assert!(file.path().exists());
        assert_eq!(file.path().extension().unwrap(), "md");
        file.remove();
    }

    #[test]
    fn allocations_never_share_a_path() {
        let first = IntermediateFile::allocate("md").unwrap();
        let second = IntermediateFile::allocate("md").unwrap();

        assert_ne!(first.path(), second.path());
        first.remove();
        second.remove();
    }

    #[test]
    fn remove_deletes_the_file() {
        let file = IntermediateFile::allocate("md").unwrap();
        let location = file.path().to_path_buf();

        file.remove();

        assert!(!location.exists());
    }
}
