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

//! Error types for the timeline model.

use crate::message::Timestamp;
use crate::session::SessionId;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing payloads or validating history snapshots
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Edit draft could not be turned into a structured payload
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A session's messages are not in ascending timestamp order
    #[error("Session {session_id} is out of order at index {index}: {previous} then {timestamp}")]
    UnorderedSession {
        session_id: SessionId,
        index: usize,
        previous: Timestamp,
        timestamp: Timestamp,
    },

    /// Session ids in a snapshot skip a value
    #[error("Session ids are not contiguous: expected {expected}, found {found}")]
    NonContiguousSessions { expected: SessionId, found: SessionId },

    /// Current session id does not name a session in the snapshot
    #[error("Current session {0} is missing from the history map")]
    MissingCurrentSession(SessionId),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
