//! Sync monitoring: a bounded attempt history with derived health.

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attempts considered by [`SyncMonitor::health`]
const HEALTH_WINDOW: usize = 5;
const CRITICAL_FAILURES: usize = 3;

/// One recorded sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAttempt {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub record_count: usize,
    pub sheet_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_sheets: Vec<String>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl SyncAttempt {
    pub fn succeeded(record_count: usize, sheet_count: usize, failed_sheets: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            success: true,
            record_count,
            sheet_count,
            failed_sheets,
            error: None,
            duration_ms: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            success: false,
            record_count: 0,
            sheet_count: 0,
            failed_sheets: Vec::new(),
            error: Some(error.into()),
            duration_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub total_syncs: usize,
    pub successful_syncs: usize,
    pub failed_syncs: usize,
    /// Percentage rounded to one decimal
    pub success_rate: f64,
    pub last_sync: Option<SyncAttempt>,
    /// Mean over attempts with a recorded duration, in milliseconds
    pub average_duration_ms: u64,
    pub is_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthLevel,
    pub message: String,
    pub last_sync: Option<SyncAttempt>,
    pub recent_failures: usize,
}

/// Newest-first history of sync attempts.
#[derive(Debug)]
pub struct SyncMonitor {
    history: VecDeque<SyncAttempt>,
    max_history: usize,
    started: Option<Instant>,
}

impl Default for SyncMonitor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SyncMonitor {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_history.min(1024)),
            max_history: max_history.max(1),
            started: None,
        }
    }

    pub fn start_sync(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Finish the running attempt, stamping its duration, and record it.
    pub fn end_sync(&mut self, mut attempt: SyncAttempt) {
        if let Some(started) = self.started.take() {
            let elapsed = started.elapsed().as_millis();
            attempt.duration_ms = Some(u64::try_from(elapsed).unwrap_or(u64::MAX));
        }
        self.record(attempt);
    }

    /// Record an attempt as-is.
    pub fn record(&mut self, attempt: SyncAttempt) {
        if attempt.success {
            tracing::info!(
                "Sync completed: {} records in {} sheets",
                attempt.record_count,
                attempt.sheet_count
            );
        } else {
            tracing::warn!(
                "Sync failed: {}",
                attempt.error.as_deref().unwrap_or("unknown error")
            );
        }
        self.history.push_front(attempt);
        self.history.truncate(self.max_history);
    }

    /// Most recent attempts, newest first.
    pub fn history(&self, limit: usize) -> Vec<SyncAttempt> {
        self.history.iter().take(limit).cloned().collect()
    }

    pub fn last(&self) -> Option<&SyncAttempt> {
        self.history.front()
    }

    pub fn stats(&self) -> SyncStats {
        let total_syncs = self.history.len();
        let successful_syncs = self.history.iter().filter(|a| a.success).count();
        let success_rate = if total_syncs == 0 {
            0.0
        } else {
            (successful_syncs as f64 / total_syncs as f64 * 1000.0).round() / 10.0
        };

        let durations: Vec<u64> = self.history.iter().filter_map(|a| a.duration_ms).collect();
        let average_duration_ms = if durations.is_empty() {
            0
        } else {
            let sum: u128 = durations.iter().map(|d| u128::from(*d)).sum();
            u64::try_from(sum / durations.len() as u128).unwrap_or(u64::MAX)
        };

        SyncStats {
            total_syncs,
            successful_syncs,
            failed_syncs: total_syncs - successful_syncs,
            success_rate,
            last_sync: self.last().cloned(),
            average_duration_ms,
            is_running: self.is_running(),
        }
    }

    pub fn health(&self) -> HealthReport {
        let recent_failures = self
            .history
            .iter()
            .take(HEALTH_WINDOW)
            .filter(|a| !a.success)
            .count();

        let (status, message) = if recent_failures >= CRITICAL_FAILURES {
            (HealthLevel::Critical, "Multiple recent sync failures detected")
        } else if recent_failures >= 1 {
            (HealthLevel::Warning, "Recent sync failures detected")
        } else if self.history.is_empty() {
            (HealthLevel::Warning, "No sync history available")
        } else {
            (HealthLevel::Healthy, "All systems operational")
        };

        HealthReport {
            status,
            message: message.to_string(),
            last_sync: self.last().cloned(),
            recent_failures,
        }
    }
}
