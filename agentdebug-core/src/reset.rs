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

//! Reset locator: where a forked session starts producing its own messages.

use crate::message::Message;
use crate::session::{Session, SessionHistoryMap, SessionId};
use std::collections::BTreeMap;

/// Session id to located reset index.
pub type ResetMap = BTreeMap<SessionId, usize>;

/// Index of the first message strictly after the session's fork point.
///
/// `None` when the session never forked, or when it has not produced a
/// message past the fork yet.
pub fn locate(session: &Session) -> Option<usize> {
    let fork = session.fork_timestamp?;
    session.messages.iter().position(|m| m.timestamp > fork)
}

/// Whether `message` was inherited from an earlier session.
///
/// Equality with the fork timestamp counts as inherited.
pub fn is_inherited(session: &Session, message: &Message) -> bool {
    session
        .fork_timestamp
        .map_or(false, |fork| message.timestamp <= fork)
}

/// Reset index for every session that has one.
pub fn locate_all(history: &SessionHistoryMap) -> ResetMap {
    history
        .iter()
        .filter_map(|(id, session)| locate(session).map(|index| (id, index)))
        .collect()
}
