// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Snapshot polling.
//!
//! Polling is the only path that changes what readers see. Each slice
//! (history, queue, run status) is fetched independently and swapped in whole,
//! so a reader holding one never observes a half-applied update. A fetch that
//! fails, or returns a history that does not validate, leaves the previous
//! slice in place.

use crate::clock::RefreshClock;
use crate::config::PollConfig;
use crate::store::SharedStore;
use agentdebug_core::{HistorySnapshot, Message};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Execution status of the inspected runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub loop_running: bool,
    pub pending: usize,
}

/// What one refresh changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub history_changed: bool,
    pub queue_changed: bool,
    pub status_changed: bool,
    /// Slices whose fetch failed or was rejected
    pub failures: usize,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Latest snapshots fetched from a store.
pub struct SnapshotSync {
    store: SharedStore,
    clock: Arc<RefreshClock>,
    config: PollConfig,
    history: watch::Sender<Arc<HistorySnapshot>>,
    queue: watch::Sender<Arc<Vec<Message>>>,
    status: watch::Sender<RunStatus>,
    synced_tick: AtomicU64,
    refreshing: Mutex<()>,
}

impl SnapshotSync {
    pub fn new(store: SharedStore, clock: Arc<RefreshClock>, config: PollConfig) -> Self {
        let (history, _) = watch::channel(Arc::new(HistorySnapshot::default()));
        let (queue, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(RunStatus::default());
        Self {
            store,
            clock,
            config,
            history,
            queue,
            status,
            synced_tick: AtomicU64::new(0),
            refreshing: Mutex::new(()),
        }
    }

    pub fn clock(&self) -> &Arc<RefreshClock> {
        &self.clock
    }

    pub fn history(&self) -> Arc<HistorySnapshot> {
        Arc::clone(&self.history.borrow())
    }

    pub fn queue(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.queue.borrow())
    }

    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<Arc<HistorySnapshot>> {
        self.history.subscribe()
    }

    pub fn subscribe_queue(&self) -> watch::Receiver<Arc<Vec<Message>>> {
        self.queue.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    /// Clock tick observed at the start of the last refresh.
    pub fn synced_tick(&self) -> u64 {
        self.synced_tick.load(Ordering::Acquire)
    }

    /// Fetch every slice once. Concurrent refreshes run one after another,
    /// so a slow fetch never overwrites a newer one.
    pub async fn refresh(&self) -> RefreshReport {
        let _serial = self.refreshing.lock().await;
        let tick = self.clock.current();
        let mut report = RefreshReport::default();

        match self.store.fetch_session_history().await {
            Ok(snapshot) => match snapshot.validate() {
                Ok(()) => report.history_changed = swap_if_changed(&self.history, snapshot),
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected invalid history snapshot, keeping previous");
                    report.failures += 1;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch session history, keeping previous");
                report.failures += 1;
            }
        }

        match self.store.fetch_queue().await {
            Ok(queue) => report.queue_changed = swap_if_changed(&self.queue, queue),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch message queue, keeping previous");
                report.failures += 1;
            }
        }

        match self.fetch_status().await {
            Ok(status) => {
                report.status_changed = self.status.send_if_modified(|current| {
                    if *current == status {
                        false
                    } else {
                        *current = status;
                        true
                    }
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch run status, keeping previous");
                report.failures += 1;
            }
        }

        self.synced_tick.fetch_max(tick, Ordering::AcqRel);
        tracing::debug!(
            tick,
            history_changed = report.history_changed,
            queue_changed = report.queue_changed,
            failures = report.failures,
            "Snapshot refresh complete"
        );
        report
    }

    async fn fetch_status(&self) -> crate::error::StoreResult<RunStatus> {
        Ok(RunStatus {
            loop_running: self.store.loop_running().await?,
            pending: self.store.pending_count().await?,
        })
    }

    /// Poll on a fixed interval, and early whenever the refresh clock moves
    /// past the last synced tick, until `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(interval_ms = self.config.interval_ms, "Snapshot poller started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = self.clock.advanced() => {
                        if self.clock.current() > self.synced_tick() {
                            self.refresh().await;
                        }
                    }
                    _ = interval.tick() => {
                        self.refresh().await;
                    }
                }
            }

            tracing::info!("Snapshot poller stopped");
        })
    }
}

/// Replace the slice unless it is structurally equal to what is there.
fn swap_if_changed<T: PartialEq>(slot: &watch::Sender<Arc<T>>, fresh: T) -> bool {
    slot.send_if_modified(|current| {
        if **current == fresh {
            false
        } else {
            *current = Arc::new(fresh);
            true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::store::HistoryStore;
    use agentdebug_core::{MessageKind, Payload, Session, SessionHistoryMap, Timestamp};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Store whose responses are set by the test.
    #[derive(Default)]
    struct ScriptedStore {
        history: Mutex<Option<StoreResult<HistorySnapshot>>>,
        fetches: AtomicU64,
    }

    impl ScriptedStore {
        fn respond(&self, response: StoreResult<HistorySnapshot>) {
            *self.history.lock() = Some(response);
        }
    }

    #[async_trait]
    impl HistoryStore for ScriptedStore {
        async fn fetch_session_history(&self) -> StoreResult<HistorySnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.history
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(HistorySnapshot::default()))
        }
        async fn fetch_queue(&self) -> StoreResult<Vec<Message>> {
            Ok(Vec::new())
        }
        async fn edit_history_message(&self, _: Timestamp, _: Option<Payload>) -> StoreResult<()> {
            Ok(())
        }
        async fn edit_queue_message(&self, _: usize, _: Payload) -> StoreResult<()> {
            Ok(())
        }
        async fn step(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn drop_next(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn start_loop(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn stop_loop(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn loop_running(&self) -> StoreResult<bool> {
            Ok(false)
        }
        async fn pending_count(&self) -> StoreResult<usize> {
            Ok(0)
        }
    }

    fn snapshot(timestamps: &[Timestamp]) -> HistorySnapshot {
        let messages = timestamps
            .iter()
            .map(|ts| {
                Message::new(*ts, MessageKind::Publish, None, None, Payload::text_message("user", "hi"))
            })
            .collect();
        let mut history = SessionHistoryMap::new();
        history.insert(0, Session::new(messages));
        HistorySnapshot::new(0, history)
    }

    fn sync_for(store: &Arc<ScriptedStore>) -> SnapshotSync {
        SnapshotSync::new(
            Arc::clone(store) as SharedStore,
            Arc::new(RefreshClock::new()),
            PollConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_refresh_swaps_snapshot() {
        let store = Arc::new(ScriptedStore::default());
        let sync = sync_for(&store);
        store.respond(Ok(snapshot(&[1, 2])));

        let report = sync.refresh().await;
        assert!(report.history_changed && report.is_clean());
        assert_eq!(sync.history().current().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_identical_snapshot_is_not_republished() {
        let store = Arc::new(ScriptedStore::default());
        let sync = sync_for(&store);
        store.respond(Ok(snapshot(&[1])));
        sync.refresh().await;

        let mut rx = sync.subscribe_history();
        let _ = rx.borrow_and_update();
        let report = sync.refresh().await;
        assert!(!report.history_changed);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_snapshot() {
        let store = Arc::new(ScriptedStore::default());
        let sync = sync_for(&store);
        store.respond(Ok(snapshot(&[1, 2, 3])));
        sync.refresh().await;

        store.respond(Err(StoreError::Transport("connection refused".into())));
        let report = sync.refresh().await;
        assert_eq!(report.failures, 1);
        assert_eq!(sync.history().current().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_snapshot_is_rejected() {
        let store = Arc::new(ScriptedStore::default());
        let sync = sync_for(&store);
        store.respond(Ok(snapshot(&[1, 2])));
        sync.refresh().await;

        store.respond(Ok(snapshot(&[5, 3])));
        let report = sync.refresh().await;
        assert_eq!(report.failures, 1);
        assert_eq!(sync.history().current().unwrap().messages[1].timestamp, 2);
    }

    #[tokio::test]
    async fn test_clock_advance_triggers_early_poll() {
        let store = Arc::new(ScriptedStore::default());
        let sync = Arc::new(SnapshotSync::new(
            Arc::clone(&store) as SharedStore,
            Arc::new(RefreshClock::new()),
            PollConfig { interval_ms: 60_000 },
        ));
        let cancel = CancellationToken::new();
        let handle = Arc::clone(&sync).spawn(cancel.clone());

        // First interval tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        let before = store.fetches.load(Ordering::SeqCst);

        store.respond(Ok(snapshot(&[9])));
        sync.clock().advance();
        tokio::time::timeout(Duration::from_secs(2), async {
            while sync.synced_tick() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(store.fetches.load(Ordering::SeqCst) > before);
        assert_eq!(sync.history().current().unwrap().messages[0].timestamp, 9);

        cancel.cancel();
        handle.await.unwrap();
    }
}
