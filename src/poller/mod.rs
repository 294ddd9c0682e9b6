//! Status poller — runs the refresh loop and publishes snapshots.
//!
//! Polls once on start, then every `interval` (fixed delay from the
//! previous scheduling point). Each cycle runs all backend checks
//! concurrently; each service check patches its own entry as soon as it
//! resolves, so one slow or failing endpoint never holds back the others.
//! Counters are written once per cycle, after every check has settled.
//! At most one cycle is in flight at a time.
//!
//! Teardown is explicit through `PollerHandle`. Checks still in flight at
//! teardown are left to finish, but whatever they resolve to is dropped.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::{SourceError, StatusSource};
use crate::status::derive;
use crate::status::{Counters, ServiceKey, ServiceState, SnapshotPatch, StatusSnapshot};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    /// How many recent activity records to request.
    pub activity_limit: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

// ── Publisher ───────────────────────────────────────────────────────

/// Single writer of the snapshot. Every patch goes through here and is
/// dropped once the poller is stopped.
///
/// The open flag is held for the whole write, so once `close` returns no
/// patch can land, whichever worker thread it was racing on.
#[derive(Clone)]
struct Publisher {
    tx: Arc<watch::Sender<StatusSnapshot>>,
    open: Arc<Mutex<bool>>,
    stopped: CancellationToken,
}

impl Publisher {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::new());
        Self {
            tx: Arc::new(tx),
            open: Arc::new(Mutex::new(true)),
            stopped: CancellationToken::new(),
        }
    }

    fn apply(&self, patch: SnapshotPatch) -> bool {
        let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        if !*open {
            debug!(?patch, "poller stopped — discarding late result");
            return false;
        }
        let now = Utc::now();
        self.tx.send_modify(|snap| snap.apply(patch, now));
        true
    }

    /// Refuse all further patches and wake the loop so it exits.
    fn close(&self) {
        *self.open.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.stopped.cancel();
    }

    fn service(&self, key: ServiceKey, state: ServiceState, detail: Option<String>) {
        self.apply(SnapshotPatch::Service { key, state, detail });
    }
}

// ── Poller ──────────────────────────────────────────────────────────

pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    settings: PollerSettings,
    publisher: Publisher,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn StatusSource>, settings: PollerSettings) -> Self {
        Self {
            source,
            settings,
            publisher: Publisher::new(),
        }
    }

    /// Receive every published snapshot (latest-value semantics).
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.publisher.tx.subscribe()
    }

    /// Copy of the latest published snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.publisher.tx.borrow().clone()
    }

    /// Run one poll cycle and wait for every check to settle.
    pub async fn poll_once(&self) {
        if !self.publisher.apply(SnapshotPatch::CycleStarted) {
            return;
        }
        let started = std::time::Instant::now();

        let (_, _, files, indexes, stats, _) = tokio::join!(
            self.check_compute_api(),
            self.check_database(),
            self.check_file_transfer(),
            self.check_ai_index(),
            self.refresh_stats(),
            self.refresh_activity(),
        );

        // Counters land in one patch so readers never see the aggregate
        // stats values before the direct observations replace them.
        if stats.is_some() || indexes.is_some() || files.is_some() {
            self.publisher.apply(SnapshotPatch::Counters {
                stats,
                vector_indexes: indexes,
                ftp_files: files,
            });
        }

        if self.publisher.apply(SnapshotPatch::CycleFinished) {
            let snap = self.snapshot();
            debug!(
                cycle = snap.cycle,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "poll cycle complete"
            );
        }
    }

    /// Start the refresh loop. Polls immediately, then on every interval.
    pub fn start(self) -> PollerHandle {
        let publisher = self.publisher.clone();
        let refresh = Arc::new(Notify::new());
        let rx = self.subscribe();
        let task = tokio::spawn(run_loop(Arc::new(self), Arc::clone(&refresh)));

        PollerHandle {
            publisher,
            refresh,
            rx,
            task: Some(task),
        }
    }

    // ── Checks ──

    async fn check_compute_api(&self) {
        let result = self.source.health().await;
        log_failure(ServiceKey::ComputeApi, &result);
        self.publisher
            .service(ServiceKey::ComputeApi, derive::liveness_state(&result), None);
    }

    async fn check_database(&self) {
        let result = self.source.articles_ping().await;
        log_failure(ServiceKey::Database, &result);
        self.publisher
            .service(ServiceKey::Database, derive::liveness_state(&result), None);
    }

    /// Connectivity, then (only when connected) the file count.
    async fn check_file_transfer(&self) -> Option<u64> {
        let result = self.source.ftp_connection().await;
        log_failure(ServiceKey::FileTransfer, &result);

        let state = derive::file_transfer_state(&result);
        let detail = result.as_ref().ok().and_then(|info| {
            info.last_connected
                .as_ref()
                .map(|at| format!("last connected {}", at))
                .or_else(|| info.error.clone())
        });
        self.publisher.service(ServiceKey::FileTransfer, state, detail);

        if state != ServiceState::Active {
            return None;
        }

        match self.source.ftp_files().await {
            Ok(listing) => Some(listing.files.len() as u64),
            Err(e) => {
                warn!(error = %e, "ftp file listing failed — keeping previous count");
                None
            }
        }
    }

    /// Index state, plus an index count of 1 when the index is ready.
    async fn check_ai_index(&self) -> Option<u64> {
        match self.source.vector_index_status().await {
            Ok(payload) => {
                let state = derive::index_state(&payload);
                if state == ServiceState::Error {
                    warn!(service = %ServiceKey::AiIndex, ?payload, "index reports an error state");
                }
                self.publisher
                    .service(ServiceKey::AiIndex, state, derive::index_detail(&payload));
                derive::index_exists(&payload).then_some(1)
            }
            Err(e) => {
                warn!(service = %ServiceKey::AiIndex, error = %e, "status check failed");
                self.publisher.service(ServiceKey::AiIndex, ServiceState::Error, None);
                None
            }
        }
    }

    /// Aggregate counters, held back until the cycle's overrides are known.
    async fn refresh_stats(&self) -> Option<Counters> {
        match self.source.stats().await {
            Ok(stats) => Some(derive::counters(&stats)),
            Err(e) => {
                warn!(error = %e, "stats fetch failed — keeping previous counters");
                None
            }
        }
    }

    async fn refresh_activity(&self) {
        let limit = self.settings.activity_limit;
        match self.source.processing_logs(limit).await {
            Ok(logs) => {
                let records = derive::activity_records(&logs, limit);
                self.publisher.apply(SnapshotPatch::Activity(records));
            }
            Err(e) => warn!(error = %e, "activity fetch failed — keeping previous entries"),
        }
    }
}

fn log_failure<T>(key: ServiceKey, result: &Result<T, SourceError>) {
    if let Err(e) = result {
        warn!(service = %key, error = %e, "status check failed");
    }
}

async fn run_loop(poller: Arc<StatusPoller>, refresh: Arc<Notify>) {
    let stopped = poller.publisher.stopped.clone();
    info!(
        interval_secs = poller.settings.interval.as_secs(),
        activity_limit = poller.settings.activity_limit,
        "📡 Status poller starting"
    );

    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        // Cycles run detached so a slow backend never delays scheduling,
        // but at most one runs at a time.
        match &in_flight {
            Some(task) if !task.is_finished() => {
                debug!("previous poll cycle still running — skipping tick");
            }
            _ => {
                let cycle = Arc::clone(&poller);
                in_flight = Some(tokio::spawn(async move { cycle.poll_once().await }));
            }
        }

        tokio::select! {
            _ = stopped.cancelled() => break,
            _ = time::sleep(poller.settings.interval) => {}
            _ = refresh.notified() => debug!("manual refresh requested"),
        }
    }

    info!("📡 Status poller stopped");
}

// ── Handle ──────────────────────────────────────────────────────────

/// Lifecycle handle for a running poller. Dropping it stops the loop.
pub struct PollerHandle {
    publisher: Publisher,
    refresh: Arc<Notify>,
    rx: watch::Receiver<StatusSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    /// Poll now instead of waiting for the next tick. The next scheduled
    /// tick follows one interval after this one.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stop scheduling polls and discard late results from in-flight ones.
    /// No snapshot mutation happens after this returns.
    pub fn stop(&self) {
        self.publisher.close();
    }

    /// Stop and wait for the loop task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.publisher.close();
    }
}
