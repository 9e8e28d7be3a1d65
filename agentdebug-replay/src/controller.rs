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

//! Replay/edit controller.
//!
//! Every mutation goes through the shared [`ActionGate`]. A successful
//! mutation advances the refresh clock and waits for a full refetch before
//! the gate reopens, so nothing is ever applied on top of a stale snapshot.
//! A failed one reopens the gate as soon as the error is recorded.

use crate::edit::{EditSlot, EditTarget};
use crate::error::{ReplayError, Result, StoreResult};
use crate::gate::ActionGate;
use crate::poller::SnapshotSync;
use crate::store::SharedStore;
use std::future::Future;
use std::sync::Arc;

pub struct ReplayController {
    store: SharedStore,
    sync: Arc<SnapshotSync>,
    gate: ActionGate,
}

impl ReplayController {
    pub fn new(store: SharedStore, sync: Arc<SnapshotSync>, gate: ActionGate) -> Self {
        Self { store, sync, gate }
    }

    pub fn gate(&self) -> &ActionGate {
        &self.gate
    }

    pub fn sync(&self) -> &Arc<SnapshotSync> {
        &self.sync
    }

    /// Whether action controls should be disabled.
    pub fn actions_suspended(&self) -> bool {
        self.gate.is_suspended()
    }

    /// Send the slot's draft to the store.
    ///
    /// Queue slots are edited in place; history slots fork a new session
    /// that replays the edited message.
    pub async fn save(&self, slot: &mut EditSlot) -> Result<()> {
        let _guard = self.gate.try_acquire().ok_or(ReplayError::ActionsSuspended)?;
        let payload = slot.begin_save()?;
        let target = slot.target();

        let outcome = match target {
            EditTarget::Queue(index) => self.store.edit_queue_message(index, payload).await,
            EditTarget::History(timestamp) => {
                self.store.edit_history_message(timestamp, Some(payload)).await
            }
        };
        slot.finish_save(&outcome);
        self.settle("save", target, outcome).await
    }

    /// Rewind to just before the slot's message and replay it unchanged.
    pub async fn revert(&self, slot: &mut EditSlot) -> Result<()> {
        let _guard = self.gate.try_acquire().ok_or(ReplayError::ActionsSuspended)?;
        let timestamp = slot.begin_revert()?;

        let outcome = self.store.edit_history_message(timestamp, None).await;
        slot.finish_revert(&outcome);
        self.settle("revert", slot.target(), outcome).await
    }

    /// Drop the local draft. Never reaches the store.
    pub fn undo(&self, slot: &mut EditSlot) -> Result<()> {
        slot.undo()?;
        Ok(())
    }

    pub async fn step(&self) -> Result<()> {
        self.control("step", |store| async move { store.step().await })
            .await
    }

    pub async fn drop_next(&self) -> Result<()> {
        self.control("drop_next", |store| async move { store.drop_next().await })
            .await
    }

    pub async fn start_loop(&self) -> Result<()> {
        self.control("start_loop", |store| async move { store.start_loop().await })
            .await
    }

    pub async fn stop_loop(&self) -> Result<()> {
        self.control("stop_loop", |store| async move { store.stop_loop().await })
            .await
    }

    async fn control<F, Fut>(&self, action: &'static str, op: F) -> Result<()>
    where
        F: FnOnce(SharedStore) -> Fut,
        Fut: Future<Output = StoreResult<()>>,
    {
        let _guard = self.gate.try_acquire().ok_or(ReplayError::ActionsSuspended)?;
        let outcome = op(Arc::clone(&self.store)).await;
        match outcome {
            Ok(()) => {
                tracing::info!(action, "Execution control applied");
                self.force_refresh().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(action, error = %e, "Execution control failed");
                Err(e.into())
            }
        }
    }

    async fn settle(
        &self,
        action: &'static str,
        target: EditTarget,
        outcome: StoreResult<()>,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                tracing::info!(action, target = ?target, "Edit applied");
                self.force_refresh().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(action, target = ?target, error = %e, "Edit rejected by store");
                Err(e.into())
            }
        }
    }

    async fn force_refresh(&self) {
        let tick = self.sync.clock().advance();
        let report = self.sync.refresh().await;
        tracing::debug!(tick, failures = report.failures, "Forced refresh after mutation");
    }
}
