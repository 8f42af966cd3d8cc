//! Directory observation and event filtering.
//!
//! A single `notify::RecommendedWatcher` observes every configured root
//! recursively. Creation events are screened by [`EventFilter`] and each
//! accepted event becomes one pipeline run:
//!
//! ```text
//! notify event -> EventFilter -> JobSpec -> ConversionPipeline::run
//! ```
//!
//! Jobs for distinct files run concurrently on spawned tasks; the watcher
//! itself only screens events and reaps finished jobs.

mod error;
mod filter;
mod monitor;

pub use error::WatchError;
pub use filter::{EventFilter, JobSpec, Skip};
pub use monitor::{DirectoryWatcher, DirectoryWatcherBuilder};
