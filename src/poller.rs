//! Background poll loop.
//!
//! The loop only keeps going while a build is in progress: after each poll it
//! looks at the builders, and once every one of them is `Idle` it reports the
//! final snapshot and exits. A manual refresh spawns a fresh poller.
//!
//! On a failed poll the last snapshot stays on screen and the loop retries
//! with exponential backoff (`interval × 2^failures`, capped at
//! `MAX_BACKOFF`). History shards are only refetched when the summary's
//! `kfiles` differs from the previous summary's: growth is new history, a
//! drop is a new run. They are fetched concurrently and the poll fails as a
//! whole if any shard is exhausted.
//!
//! Every event carries the poller's generation. A shut-down poller may still
//! deliver the result of a fetch that was in flight; the receiver drops it.

use crate::error::PollError;
use crate::events::AppEvent;
use crate::fetch::RetryingFetcher;
use crate::history::shards_changed;
use crate::model::{BuildResultRecord, SummarySnapshot};
use crate::source::{Endpoint, SnapshotSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;

const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Result of one successful poll. `history` is `None` when the shard count
/// did not change and the stored history is still current.
#[derive(Debug, Clone)]
pub struct PollSnapshot {
    pub summary: SummarySnapshot,
    pub history: Option<Vec<Vec<BuildResultRecord>>>,
}

/// `min(base × 2^failures, MAX_BACKOFF)`.
pub fn backoff_delay(base: Duration, failures: u32) -> Duration {
    let multiplier = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
    base.saturating_mul(multiplier).min(MAX_BACKOFF)
}

/// Fetches every shard `1..=kfiles` concurrently, returned in shard order.
pub async fn fetch_history(
    fetcher: &Arc<RetryingFetcher>,
    source: &SnapshotSource,
    kfiles: usize,
) -> Result<Vec<Vec<BuildResultRecord>>, PollError> {
    let mut tasks = JoinSet::new();
    for index in 1..=kfiles {
        let url = source.build_url(Endpoint::History(index));
        let fetcher = Arc::clone(fetcher);
        tasks.spawn(async move {
            let shard = fetcher.fetch_json::<Vec<BuildResultRecord>>(&url).await;
            (index, shard)
        });
    }

    let mut shards = vec![Vec::new(); kfiles];
    while let Some(joined) = tasks.join_next().await {
        let (index, shard) = joined.map_err(|e| PollError::Join(e.to_string()))?;
        // Returning early drops the set, which aborts the remaining fetches.
        shards[index - 1] = shard?;
    }
    Ok(shards)
}

/// Summary first, then the full shard set if `kfiles` differs from `observed_kfiles`.
pub async fn fetch_snapshot(
    fetcher: &Arc<RetryingFetcher>,
    source: &SnapshotSource,
    observed_kfiles: Option<usize>,
) -> Result<PollSnapshot, PollError> {
    let summary: SummarySnapshot = fetcher
        .fetch_json(&source.build_url(Endpoint::Summary))
        .await?;
    let history = if shards_changed(observed_kfiles, summary.kfiles) {
        tracing::info!(
            kfiles = summary.kfiles,
            previous = ?observed_kfiles,
            "shard count changed, refetching history"
        );
        Some(fetch_history(fetcher, source, summary.kfiles).await?)
    } else {
        None
    };
    Ok(PollSnapshot { summary, history })
}

/// Why a poller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// No builder was active in the last poll.
    Inactive,
    Shutdown,
    ChannelClosed,
}

enum PollOutcome {
    Active,
    Inactive,
    Failure(String),
    ChannelClosed,
}

/// Handle to a spawned poller.
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<PollExit>,
}

impl PollHandle {
    /// Asks the loop to stop; an in-flight fetch is not interrupted.
    pub fn shutdown(&self) {
        // Err means the loop already exited.
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Option<PollExit> {
        self.task.await.ok()
    }
}

pub struct Poller {
    fetcher: Arc<RetryingFetcher>,
    source: Arc<SnapshotSource>,
    interval: Duration,
    observed_kfiles: Option<usize>,
    immediate: bool,
    generation: u64,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl Poller {
    pub fn new(
        fetcher: Arc<RetryingFetcher>,
        source: Arc<SnapshotSource>,
        interval: Duration,
        observed_kfiles: Option<usize>,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            fetcher,
            source,
            interval,
            observed_kfiles,
            immediate: false,
            generation: 0,
            tx,
        }
    }

    /// Poll right away instead of waiting one interval first (manual refresh).
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Tags every event this poller sends.
    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn spawn(self) -> PollHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        PollHandle { shutdown, task }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PollExit {
        let mut failures: u32 = 0;
        let mut first = true;

        loop {
            if !(first && self.immediate) {
                let delay = if failures > 0 {
                    backoff_delay(self.interval, failures)
                } else {
                    self.interval
                };
                tokio::select! {
                    () = time::sleep(delay) => {},
                    _ = shutdown.changed() => {
                        tracing::info!("poller shut down");
                        return PollExit::Shutdown;
                    }
                }
            }
            first = false;

            match self.poll_once().await {
                PollOutcome::Active => failures = 0,
                PollOutcome::Inactive => {
                    tracing::info!("no builder active, polling stopped");
                    return PollExit::Inactive;
                }
                PollOutcome::Failure(message) => {
                    failures = failures.saturating_add(1);
                    let event = AppEvent::PollFailed {
                        generation: self.generation,
                        message,
                        retry_in: backoff_delay(self.interval, failures),
                    };
                    if self.tx.send(event).is_err() {
                        return PollExit::ChannelClosed;
                    }
                }
                PollOutcome::ChannelClosed => return PollExit::ChannelClosed,
            }
        }
    }

    async fn poll_once(&mut self) -> PollOutcome {
        match fetch_snapshot(&self.fetcher, &self.source, self.observed_kfiles).await {
            Ok(snapshot) => {
                self.observed_kfiles = Some(snapshot.summary.kfiles);
                let active = snapshot.summary.any_builder_active();
                let event = AppEvent::PollResult {
                    generation: self.generation,
                    snapshot: Box::new(snapshot),
                };
                if self.tx.send(event).is_err() {
                    return PollOutcome::ChannelClosed;
                }
                if active {
                    PollOutcome::Active
                } else {
                    PollOutcome::Inactive
                }
            }
            Err(e) => {
                tracing::warn!("poll failed: {e}");
                PollOutcome::Failure(e.to_string())
            }
        }
    }
}
