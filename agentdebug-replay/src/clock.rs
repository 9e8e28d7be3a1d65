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

//! Logical refresh clock.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// Counter advanced after every successful mutation.
///
/// The poller refetches whenever the clock moves past the tick it last
/// synced at.
#[derive(Debug, Default)]
pub struct RefreshClock {
    tick: AtomicU64,
    notify: Notify,
}

impl RefreshClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Advance and wake the poller. Returns the new tick.
    pub fn advance(&self) -> u64 {
        let tick = self.tick.fetch_add(1, Ordering::AcqRel) + 1;
        self.notify.notify_one();
        tick
    }

    /// Resolves after the next [`advance`](Self::advance), or immediately if
    /// one happened while nobody was waiting.
    pub async fn advanced(&self) {
        self.notify.notified().await
    }
}
