// THEORY:
// The `coordinator` module is the composition root of the engine. It owns
// the configured sources, one pipeline runner, and one discovery publisher,
// and it runs one independent scheduling loop per source.
//
// Key architectural principles:
// 1.  **Independent cadences**: each source loop sleeps until its own
//     `next_poll_at` and reschedules as `now + interval` after every tick,
//     regardless of outcome. Intervals never compound, and a slow or
//     erroring source cannot starve the others.
// 2.  **Exclusive runtime state**: every loop owns its source and its
//     `SourceRuntimeState` outright. No lock guards them because no one
//     else can touch them; the only shared state is the publisher's
//     announced set and the pub/sub client.
// 3.  **Mark seen before processing**: `last_fingerprint_seen` is updated
//     the moment a new fingerprint is accepted, before the pipeline runs.
//     A run that fails (corrupt file, publish outage) is not retried for
//     that image; the next distinct fingerprint is what gets processed.
// 4.  **Drain on shutdown**: a shutdown signal stops loops at their next
//     waiting point. In-flight ticks run to completion within a bounded
//     grace period; nothing is cancelled mid-pipeline.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::core_modules::pixel_buffer::Fingerprint;
use crate::core_modules::source::ImageSource;
use crate::discovery::DiscoveryPublisher;
use crate::pipeline::PipelineRunner;

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Per-source mutable scheduling state. One exists per configured source,
/// created at startup and touched only by that source's own loop.
struct SourceRuntimeState {
    last_fingerprint_seen: Option<Fingerprint>,
    next_poll_at: Instant,
    consecutive_errors: u32,
}

impl SourceRuntimeState {
    fn new() -> Self {
        Self {
            last_fingerprint_seen: None,
            next_poll_at: Instant::now(),
            consecutive_errors: 0,
        }
    }
}

/// Owns the sources and processors and schedules all polling.
pub struct Coordinator {
    sources: Vec<Box<dyn ImageSource>>,
    runner: Arc<PipelineRunner>,
    publisher: Arc<DiscoveryPublisher>,
    shutdown_grace: Duration,
}

impl Coordinator {
    pub fn new(
        sources: Vec<Box<dyn ImageSource>>,
        runner: PipelineRunner,
        publisher: Arc<DiscoveryPublisher>,
    ) -> Self {
        Self {
            sources,
            runner: Arc::new(runner),
            publisher,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Starts every source, announces every sensor up front, then runs one
    /// scheduling loop per source until the shutdown signal flips.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) {
        for source in &mut self.sources {
            source.start();
        }
        // Sensors are registered before the first image is ever processed,
        // so consumers see them immediately.
        for source in &self.sources {
            for processor in self.runner.processors() {
                self.publisher
                    .announce_processor(source.name(), processor.as_ref());
            }
        }

        let mut handles = Vec::with_capacity(self.sources.len());
        for source in self.sources {
            handles.push(tokio::spawn(source_loop(
                source,
                Arc::clone(&self.runner),
                Arc::clone(&self.publisher),
                shutdown.clone(),
            )));
        }
        info!(loops = handles.len(), "coordinator started");

        let mut shutdown_wait = shutdown;
        while !*shutdown_wait.borrow() {
            if shutdown_wait.changed().await.is_err() {
                break;
            }
        }

        info!("draining source loops");
        let drain = join_all(handles);
        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            warn!(
                grace = ?self.shutdown_grace,
                "shutdown grace period elapsed with work still in flight"
            );
        }
        info!("coordinator stopped");
    }
}

/// The scheduling loop for one source: Idle until `next_poll_at`, then one
/// tick (poll, and process when a new image appeared), then Idle again.
async fn source_loop(
    mut source: Box<dyn ImageSource>,
    runner: Arc<PipelineRunner>,
    publisher: Arc<DiscoveryPublisher>,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = source.update_interval();
    let mut state = SourceRuntimeState::new();
    info!(source = %source.name(), interval = ?interval, "source loop started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(state.next_poll_at) => {}
            changed = shutdown.changed() => {
                // A closed channel means the coordinator is gone; stop too.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }
        if Instant::now() < state.next_poll_at {
            continue;
        }

        tick(source.as_mut(), &mut state, &runner, &publisher);
        // Rescheduled from completion time whatever the outcome; intervals
        // do not compound.
        state.next_poll_at = Instant::now() + interval;
    }

    source.stop();
    info!(source = %source.name(), "source loop stopped");
}

/// One scheduling tick: poll, and when a genuinely new image arrived, run
/// the pipeline and publish the batch.
fn tick(
    source: &mut dyn ImageSource,
    state: &mut SourceRuntimeState,
    runner: &PipelineRunner,
    publisher: &DiscoveryPublisher,
) {
    match source.poll() {
        Err(e) => {
            state.consecutive_errors += 1;
            warn!(source = %source.name(), consecutive_errors = state.consecutive_errors,
                  error = %e, "poll failed; tick yields no image");
        }
        Ok(None) => {
            state.consecutive_errors = 0;
        }
        Ok(Some(handle)) => {
            state.consecutive_errors = 0;
            if state.last_fingerprint_seen == Some(handle.fingerprint) {
                return;
            }
            // Marked seen before processing: a crash or failure mid-run
            // must not cause this image to be reprocessed.
            state.last_fingerprint_seen = Some(handle.fingerprint);
            info!(source = %source.name(), path = %handle.path.display(), "processing new image");
            match runner.run(&handle) {
                Ok(batch) => publisher.publish_batch(source.name(), &batch),
                Err(e) => {
                    error!(source = %source.name(), error = %e, "pipeline run failed");
                }
            }
        }
    }
}
