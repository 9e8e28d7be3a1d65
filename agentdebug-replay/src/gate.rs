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

//! Process-wide action gate.
//!
//! At most one mutation may be outstanding against the store. Every
//! action-triggering control asks the gate first and backs off when it is
//! closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "actions suspended" flag.
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    suspended: Arc<AtomicBool>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate, or `None` when it is already closed.
    pub fn try_acquire(&self) -> Option<GateGuard> {
        self.suspended
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard {
                suspended: Arc::clone(&self.suspended),
            })
    }

    /// Whether controls should render disabled.
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }
}

/// Holds the gate closed until dropped.
#[derive(Debug)]
pub struct GateGuard {
    suspended: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.suspended.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_holder() {
        let gate = ActionGate::new();
        let guard = gate.try_acquire();
        assert!(guard.is_some());
        assert!(gate.is_suspended());
        assert!(gate.clone().try_acquire().is_none());

        drop(guard);
        assert!(!gate.is_suspended());
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_released_when_task_fails() {
        let gate = ActionGate::new();
        let held = gate.clone();
        let result = tokio::spawn(async move {
            let _guard = held.try_acquire();
            Err::<(), &str>("store unreachable")
        })
        .await
        .unwrap();

        assert!(result.is_err());
        assert!(!gate.is_suspended());
    }
}
