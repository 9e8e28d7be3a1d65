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

//! History and execution store seam.

use crate::error::StoreResult;
use agentdebug_core::{HistorySnapshot, Message, Payload, Timestamp};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything the debugger needs from the runtime it inspects.
///
/// Reads return full snapshots; mutations report only success or failure.
/// Callers never patch local state from a mutation result, they refetch.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Current session id and every known session.
    async fn fetch_session_history(&self) -> StoreResult<HistorySnapshot>;

    /// Pending messages, head first.
    async fn fetch_queue(&self) -> StoreResult<Vec<Message>>;

    /// Rewind to just before the message at `timestamp` and replay it,
    /// with `payload` when given or the original content otherwise.
    async fn edit_history_message(
        &self,
        timestamp: Timestamp,
        payload: Option<Payload>,
    ) -> StoreResult<()>;

    /// Replace the payload of the pending message at `index`.
    ///
    /// The index is positional. If the queue moved since it was read, the
    /// edit lands on whatever message now sits there.
    async fn edit_queue_message(&self, index: usize, payload: Payload) -> StoreResult<()>;

    async fn step(&self) -> StoreResult<()>;

    async fn drop_next(&self) -> StoreResult<()>;

    async fn start_loop(&self) -> StoreResult<()>;

    async fn stop_loop(&self) -> StoreResult<()>;

    async fn loop_running(&self) -> StoreResult<bool>;

    async fn pending_count(&self) -> StoreResult<usize>;
}

/// Shared handle to a store
pub type SharedStore = Arc<dyn HistoryStore>;
