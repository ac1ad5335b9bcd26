// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up scheduling and delivery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use atende_core::AtendeError;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::record::FollowUpRecord;
use crate::store::FollowUpStore;

/// Delivers a due reminder.
///
/// Return [`AtendeError::NotReady`] when the session exists but cannot send
/// right now; the record is kept for a later tick.
#[async_trait]
pub trait FollowUpSender: Send + Sync {
    async fn send_follow_up(&self, record: &FollowUpRecord) -> Result<(), AtendeError>;
}

/// Outcome counts of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sent: usize,
    pub not_ready: usize,
    pub failed: usize,
}

/// Keeps at most one pending reminder per `sessionName|chatId` and delivers
/// it once due.
///
/// `schedule` and `tick` share one lock around the record map and the file
/// write, so both follow the same write discipline. Sends happen outside the
/// lock.
pub struct FollowUpScheduler {
    delay: TimeDelta,
    store: Option<FollowUpStore>,
    records: Mutex<HashMap<String, FollowUpRecord>>,
    sender: ArcSwapOption<Box<dyn FollowUpSender>>,
}

impl FollowUpScheduler {
    /// A scheduler that keeps records in memory only.
    pub fn in_memory(delay: Duration) -> Self {
        Self::with_records(delay, None, Vec::new())
    }

    /// Opens the durable store at `path` and loads its records.
    pub fn open(path: impl Into<std::path::PathBuf>, delay: Duration) -> Result<Self, AtendeError> {
        let (store, records) = FollowUpStore::open(path)?;
        info!(
            path = %store.path().display(),
            pending = records.len(),
            "follow-up scheduler loaded"
        );
        Ok(Self::with_records(delay, Some(store), records))
    }

    fn with_records(
        delay: Duration,
        store: Option<FollowUpStore>,
        records: Vec<FollowUpRecord>,
    ) -> Self {
        let delay = TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX);
        let mut map = HashMap::new();
        for record in records {
            // Latest schedule wins, even among loaded records.
            match map.get(&record.key()) {
                Some(existing) if existing_is_newer(existing, &record) => {}
                _ => {
                    map.insert(record.key(), record);
                }
            }
        }
        Self {
            delay,
            store,
            records: Mutex::new(map),
            sender: ArcSwapOption::empty(),
        }
    }

    /// Installs the delivery callback. Replaces any previous sender.
    pub fn set_sender(&self, sender: Box<dyn FollowUpSender>) {
        self.sender.store(Some(Arc::new(sender)));
    }

    /// Schedules `record`, replacing any pending record with the same key.
    pub async fn schedule(&self, record: FollowUpRecord) -> Result<(), AtendeError> {
        let mut records = self.records.lock().await;
        debug!(key = %record.key(), "follow-up scheduled");
        records.insert(record.key(), record);
        self.persist(&records).await
    }

    /// Pending records, oldest first.
    pub async fn pending(&self) -> Vec<FollowUpRecord> {
        let mut pending: Vec<_> = self.records.lock().await.values().cloned().collect();
        pending.sort_by_key(|r| r.created_at);
        pending
    }

    /// Delivers every due record using the current time.
    pub async fn tick(&self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// Delivers every record due at `now`.
    ///
    /// Successful deliveries are deleted and persisted. Records whose send
    /// fails stay pending and are not retried before the next tick. A record
    /// rescheduled while its send was in flight is kept.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let Some(sender) = self.sender.load_full() else {
            debug!("follow-up tick skipped: no sender installed");
            return report;
        };

        let mut due: Vec<FollowUpRecord> = self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.is_due(now, self.delay))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.created_at);

        let mut delivered = Vec::new();
        for record in due {
            match sender.send_follow_up(&record).await {
                Ok(()) => {
                    report.sent += 1;
                    delivered.push(record);
                }
                Err(AtendeError::NotReady { session }) => {
                    report.not_ready += 1;
                    debug!(key = %record.key(), %session, "follow-up deferred: session not ready");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(key = %record.key(), error = %e, "follow-up delivery failed, keeping record");
                }
            }
        }

        if !delivered.is_empty() {
            let mut records = self.records.lock().await;
            for record in &delivered {
                let key = record.key();
                if records.get(&key).is_some_and(|r| r.id == record.id) {
                    records.remove(&key);
                }
            }
            if let Err(e) = self.persist(&records).await {
                warn!(error = %e, "failed to persist follow-up store after delivery");
            }
        }

        if report != TickReport::default() {
            info!(
                sent = report.sent,
                not_ready = report.not_ready,
                failed = report.failed,
                "follow-up tick"
            );
        }
        report
    }

    /// Ticks every `interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("follow-up loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn persist(&self, records: &HashMap<String, FollowUpRecord>) -> Result<(), AtendeError> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let mut snapshot: Vec<FollowUpRecord> = records.values().cloned().collect();
        snapshot.sort_by_key(|r| r.created_at);
        tokio::task::spawn_blocking(move || store.persist(&snapshot))
            .await
            .map_err(|e| AtendeError::Internal(format!("follow-up persist task failed: {e}")))?
    }
}

fn existing_is_newer(existing: &FollowUpRecord, candidate: &FollowUpRecord) -> bool {
    existing.created_at > candidate.created_at
}
