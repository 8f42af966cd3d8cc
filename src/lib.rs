//! Event-driven document conversion.
//!
//! docwatch watches directories for newly created structured documents and
//! converts each one in place through a two-stage pipeline: an external
//! formatter produces a transient intermediate file, and an in-process
//! assembler turns that into the final artifact next to the source.

pub mod config;
pub mod convert;
pub mod logging;
pub mod pipeline;
pub mod watcher;

pub use config::Settings;
pub use convert::{Assembler, ConvertError, Formatter, FormatterOutput};
pub use pipeline::{ConversionPipeline, IntermediateFile, PipelineError};
pub use watcher::{DirectoryWatcher, EventFilter, JobSpec, Skip, WatchError};
