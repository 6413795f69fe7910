//! The sync driver: runs orchestrated syncs, publishes results to the
//! store, and keeps the attempt history.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SheetSyncConfig;
use crate::error::{PersistenceError, Result, SyncError};
use crate::monitor::{SyncAttempt, SyncMonitor};
use crate::orchestrator::SyncOrchestrator;
use crate::snapshot::Snapshot;
use crate::source::SheetSource;
use crate::store::RecordStore;

/// Summary of one successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub record_count: usize,
    pub sheet_count: usize,
    /// Tabs recorded as empty because their fetch failed
    pub failed_sheets: Vec<String>,
    /// Tabs skipped by the exclusion marker
    pub excluded_sheets: Vec<String>,
    pub duration_ms: u64,
    pub synced_at: Option<DateTime<Utc>>,
}

pub struct SyncDriver {
    source: Arc<dyn SheetSource>,
    store: Arc<RecordStore>,
    config: SheetSyncConfig,
    monitor: Mutex<SyncMonitor>,
    in_flight: tokio::sync::Mutex<()>,
}

impl SyncDriver {
    pub fn new(source: Arc<dyn SheetSource>, store: Arc<RecordStore>, config: SheetSyncConfig) -> Self {
        let monitor = SyncMonitor::new(config.sync.history_size);
        Self {
            source,
            store,
            config,
            monitor: Mutex::new(monitor),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn config(&self) -> &SheetSyncConfig {
        &self.config
    }

    /// Lock the attempt history.
    pub fn monitor(&self) -> MutexGuard<'_, SyncMonitor> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Run one sync and publish its snapshot.
    ///
    /// Returns [`SyncError::AlreadyRunning`] without touching the store when
    /// another sync is in flight. Enumeration failure leaves the previous
    /// snapshot in place and is returned; per-tab failures are not errors.
    pub async fn trigger_sync(&self) -> Result<SyncReport> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;

        tracing::info!("Starting sync");
        self.monitor().start_sync();
        let started = Instant::now();

        let orchestrator = SyncOrchestrator::from_config(self.source.as_ref(), &self.config);
        let batch = match orchestrator.sync_all().await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!("Sync failed, keeping previous snapshot: {}", e);
                self.monitor().end_sync(SyncAttempt::failed(e.to_string()));
                return Err(e.into());
            }
        };

        let failed_sheets: Vec<String> = batch.failures.into_iter().map(|f| f.sheet).collect();
        let published = match self.publish(batch.snapshot).await {
            Ok(published) => published,
            Err(e) => {
                tracing::error!("Publishing snapshot failed: {}", e);
                self.monitor().end_sync(SyncAttempt::failed(e.to_string()));
                return Err(e);
            }
        };
        let report = SyncReport {
            record_count: published.record_count(),
            sheet_count: published.sheet_count(),
            failed_sheets: failed_sheets.clone(),
            excluded_sheets: batch.excluded,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            synced_at: published.last_sync_time,
        };

        self.monitor().end_sync(SyncAttempt::succeeded(
            report.record_count,
            report.sheet_count,
            failed_sheets,
        ));
        Ok(report)
    }

    /// Swap in and persist a snapshot on the blocking pool, off the async
    /// workers.
    async fn publish(&self, snapshot: Snapshot) -> Result<Arc<Snapshot>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.replace_snapshot(snapshot))
            .await
            .map_err(|e| SyncError::from(PersistenceError::Io(format!("Publish task failed: {}", e))))
    }

    /// Run [`Self::trigger_sync`] every `interval_minutes` until the task is
    /// aborted. The first run happens one full interval after spawning.
    pub fn spawn_periodic(self: Arc<Self>) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.sync.interval_minutes.max(1) * 60);
        tracing::info!(
            "Scheduling sync every {} minutes",
            self.config.sync.interval_minutes.max(1)
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.trigger_sync().await {
                    Ok(report) => tracing::debug!(
                        "Scheduled sync published {} records",
                        report.record_count
                    ),
                    Err(SyncError::AlreadyRunning) => {
                        tracing::info!("Skipping scheduled sync, previous one still running")
                    }
                    Err(e) => tracing::warn!("Scheduled sync failed: {}", e),
                }
            }
        })
    }
}
