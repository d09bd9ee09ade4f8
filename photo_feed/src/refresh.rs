//! Periodic refresh of the photo store from the remote source.
//!
//! The schedule ticks on a fixed period measured from the timer, not from the
//! end of the previous cycle. Each tick spawns its cycle as a separate task, so
//! a fetch that outlasts the interval overlaps with the next one. Overlap is
//! harmless because merging is idempotent per id.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::{
    error::FetchError,
    settings::RefreshSettings,
    source::PhotoSource,
    store::{MergeReport, PhotoStore},
};

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&RefreshSettings> for RefreshConfig {
    fn from(settings: &RefreshSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_seconds),
            max_attempts: settings.max_attempts,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

/// Cumulative counters for the worker's cycles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub cycles_started: u64,
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_report: Option<MergeReport>,
    pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct RefreshWorker {
    store: Arc<PhotoStore>,
    source: Arc<dyn PhotoSource>,
    config: RefreshConfig,
    status: Arc<Mutex<RefreshStatus>>,
}

impl RefreshWorker {
    pub fn new(store: Arc<PhotoStore>, source: Arc<dyn PhotoSource>, config: RefreshConfig) -> Self {
        Self {
            store,
            source,
            config,
            status: Arc::new(Mutex::new(RefreshStatus::default())),
        }
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.lock().clone()
    }

    /// Fetch the remote collection and merge it into the store.
    ///
    /// A failed fetch is retried up to `max_attempts` times. When every
    /// attempt fails the store is left untouched and the last error returned.
    #[instrument(skip(self), fields(source = %self.source.describe()))]
    pub async fn run_cycle(&self) -> Result<MergeReport, FetchError> {
        self.status.lock().cycles_started += 1;

        match self.fetch_with_retry().await {
            Ok(photos) => {
                let report = self.store.merge(photos);
                info!(
                    fetched = report.fetched,
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    total = self.store.len(),
                    "Refresh cycle complete"
                );

                let mut status = self.status.lock();
                status.cycles_succeeded += 1;
                status.last_success_at = Some(Utc::now());
                status.last_report = Some(report);
                Ok(report)
            }
            Err(e) => {
                error!(kind = e.kind(), "Refresh cycle failed: {}", e);

                let mut status = self.status.lock();
                status.cycles_failed += 1;
                status.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_with_retry(&self) -> Result<Vec<crate::model::Photo>, FetchError> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.source.fetch_all().await {
                Ok(photos) => return Ok(photos),
                Err(e) if attempt < attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        "Fetch attempt failed, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Linear backoff, saturating instead of overflowing.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.config
            .retry_backoff
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }

    /// Run one cycle now and then one per interval tick until cancelled.
    pub fn spawn(self) -> RefreshHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let status = self.status.clone();
        let interval = self.config.interval;

        let task = tokio::spawn(async move {
            info!("Starting refresh schedule every {:?}", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    changed = cancel_rx.changed() => {
                        // A dropped handle counts as cancellation
                        if changed.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let worker = self.clone();
                        tokio::spawn(async move {
                            // Failures are logged and counted inside run_cycle
                            let _ = worker.run_cycle().await;
                        });
                    }
                }
            }

            info!("Refresh schedule stopped");
        });

        RefreshHandle {
            cancel_tx,
            task: Some(task),
            status,
        }
    }
}

/// Owner-side control over a spawned refresh schedule.
///
/// Dropping the handle cancels the schedule.
pub struct RefreshHandle {
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    status: Arc<Mutex<RefreshStatus>>,
}

impl RefreshHandle {
    /// Stop future cycles. A cycle already running finishes normally.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.lock().clone()
    }

    /// Cancel and wait for the scheduler loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Refresh scheduler ended abnormally: {}", e);
            }
        }
    }
}
