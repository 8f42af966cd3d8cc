//! The directory watcher: recursive observation of the configured roots.

use std::path::PathBuf;
use std::sync::Arc;

use notify::event::CreateKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::pipeline::ConversionPipeline;

use super::error::WatchError;
use super::filter::{EventFilter, JobSpec};

/// Watches a set of root directories and runs one pipeline job per accepted
/// creation event.
///
/// Shutdown is signalled through a `watch` channel: the event loop stops
/// taking events and drains the jobs still in flight, so interrupted runs
/// never leave a job half-reaped.
pub struct DirectoryWatcher {
    roots: Vec<PathBuf>,
    filter: EventFilter,
    pipeline: Arc<ConversionPipeline>,
    shutdown: watch::Receiver<bool>,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    watcher: notify::RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> DirectoryWatcherBuilder {
        DirectoryWatcherBuilder::new()
    }

    /// Watch until the shutdown signal fires.
    ///
    /// Establishes a recursive watch on each root independently. A root that
    /// cannot be watched is logged and skipped so the remaining roots keep
    /// working; only when not a single root could be watched does the call
    /// fail.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        let mut watched = 0usize;
        for root in &self.roots {
            match self.watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    watched += 1;
                    tracing::info!("[watcher] monitoring {} (recursive)", root.display());
                }
                Err(e) => {
                    tracing::error!("[watcher] cannot watch {}: {e}", root.display());
                }
            }
        }
        if watched == 0 {
            return Err(WatchError::NoWatchableRoots);
        }

        tracing::info!("[watcher] started");

        let mut jobs: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(Ok(event)) => self.dispatch(event, &mut jobs),
                        Some(Err(e)) => tracing::error!("[watcher] event error: {e}"),
                        None => return Err(WatchError::ChannelClosed),
                    }
                }

                // Reap finished jobs; their terminal record is already written.
                Some(_) = jobs.join_next(), if !jobs.is_empty() => {}

                _ = self.shutdown.changed() => break,
            }
        }

        if !jobs.is_empty() {
            tracing::info!(
                "[watcher] shutting down, waiting for {} job(s) in flight",
                jobs.len()
            );
        }
        while jobs.join_next().await.is_some() {}

        tracing::info!("[watcher] stopped");
        Ok(())
    }

    /// Route one event through the filter, spawning a pipeline job on
    /// acceptance. Only creation events are consumed.
    fn dispatch(&self, event: Event, jobs: &mut JoinSet<()>) {
        let EventKind::Create(kind) = event.kind else {
            return;
        };

        for path in event.paths {
            tracing::debug!("[watcher] created: {}", path.display());

            let is_directory = match kind {
                CreateKind::Folder => true,
                CreateKind::File => false,
                // Some backends only report a bare create; ask the filesystem.
                _ => path.is_dir(),
            };

            match self.filter.evaluate(&path, is_directory) {
                Ok(spec) => {
                    tracing::info!("[watcher] processing {}", spec.source.display());
                    jobs.spawn(run_job(Arc::clone(&self.pipeline), spec));
                }
                Err(skip) => {
                    tracing::debug!("[watcher] skipped ({skip}): {}", path.display());
                }
            }
        }
    }
}

/// Run one job and write its terminal log record.
async fn run_job(pipeline: Arc<ConversionPipeline>, spec: JobSpec) {
    match pipeline.run(&spec).await {
        Ok(output) => {
            tracing::info!(
                "[pipeline] converted {} -> {}",
                spec.source.display(),
                output.display()
            );
        }
        Err(e) => {
            tracing::error!(
                "[pipeline] {} failed during {}: {e}",
                spec.source.display(),
                e.stage()
            );
        }
    }
}

/// Builder for constructing a [`DirectoryWatcher`].
pub struct DirectoryWatcherBuilder {
    roots: Vec<PathBuf>,
    filter: Option<EventFilter>,
    pipeline: Option<Arc<ConversionPipeline>>,
    shutdown: Option<watch::Receiver<bool>>,
    channel_capacity: usize,
}

impl DirectoryWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            filter: None,
            pipeline: None,
            shutdown: None,
            channel_capacity: 100,
        }
    }

    /// Add one root path.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Add several root paths.
    pub fn roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.roots.extend(roots);
        self
    }

    /// Set the event filter.
    pub fn filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the conversion pipeline.
    pub fn pipeline(mut self, pipeline: Arc<ConversionPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the shutdown signal receiver.
    pub fn shutdown(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    /// Set the capacity of the notify-to-loop event channel.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the watcher.
    pub fn build(self) -> Result<DirectoryWatcher, WatchError> {
        if self.roots.is_empty() {
            return Err(WatchError::InitFailed {
                reason: "at least one root path is required".to_string(),
            });
        }
        let filter = self.filter.ok_or_else(|| WatchError::InitFailed {
            reason: "filter is required".to_string(),
        })?;
        let pipeline = self.pipeline.ok_or_else(|| WatchError::InitFailed {
            reason: "pipeline is required".to_string(),
        })?;
        let shutdown = self.shutdown.ok_or_else(|| WatchError::InitFailed {
            reason: "shutdown channel is required".to_string(),
        })?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(DirectoryWatcher {
            roots: self.roots,
            filter,
            pipeline,
            shutdown,
            event_rx: rx,
            watcher,
        })
    }
}

impl Default for DirectoryWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Assembler, ConvertError, Formatter, FormatterOutput};
    use async_trait::async_trait;
    use std::path::Path;

    struct NopFormatter;

    #[async_trait]
    impl Formatter for NopFormatter {
        async fn format(
            &self,
            _input: &Path,
            _format: &str,
            _output: &Path,
        ) -> Result<FormatterOutput, ConvertError> {
            Ok(FormatterOutput::default())
        }
    }

    struct NopAssembler;

    impl Assembler for NopAssembler {
        fn assemble(&self, _intermediate: &Path, _output: &Path) -> Result<String, ConvertError> {
            Ok(String::new())
        }
    }

    fn pipeline() -> Arc<ConversionPipeline> {
        Arc::new(ConversionPipeline::new(
            Arc::new(NopFormatter),
            Arc::new(NopAssembler),
            "md",
            "html",
        ))
    }

    #[test]
    fn build_requires_at_least_one_root() {
        let (_tx, rx) = watch::channel(false);
        let result = DirectoryWatcher::builder()
            .filter(EventFilter::new("config-", "xml", "html"))
            .pipeline(pipeline())
            .shutdown(rx)
            .build();

        assert!(matches!(result, Err(WatchError::InitFailed { .. })));
    }

    #[test]
    fn build_requires_a_pipeline() {
        let (_tx, rx) = watch::channel(false);
        let result = DirectoryWatcher::builder()
            .root("/tmp")
            .filter(EventFilter::new("config-", "xml", "html"))
            .shutdown(rx)
            .build();

        assert!(matches!(result, Err(WatchError::InitFailed { .. })));
    }
}
