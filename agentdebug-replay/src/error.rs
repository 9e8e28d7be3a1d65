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

//! Replay error types

use agentdebug_core::{CoreError, MessageKind, Timestamp};
use thiserror::Error;

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a [`crate::HistoryStore`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store refused the request
    #[error("Rejected by store: {0}")]
    Rejected(String),

    /// No message with this timestamp in the current session
    #[error("No message at timestamp {0} in the current session")]
    UnknownTimestamp(Timestamp),

    #[error("Queue index {index} out of range (queue length {len})")]
    QueueIndex { index: usize, len: usize },

    /// Only published or sent messages can be replayed
    #[error("{0} messages cannot be re-sent")]
    NotResendable(MessageKind),
}

/// Edit slot transitions that were refused locally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{0} messages are not editable")]
    NotEditable(MessageKind),

    /// Revert applies to history messages only
    #[error("Queue messages cannot be reverted to")]
    NotRevertible,

    #[error(transparent)]
    Malformed(#[from] CoreError),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

/// Errors surfaced by the replay controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// Another mutation is in flight
    #[error("Actions are suspended while another request is outstanding")]
    ActionsSuspended,

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
