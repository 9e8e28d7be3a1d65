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

//! Sessions and history snapshots.
//!
//! A session is one branch of a conversation. Editing a past message forks a
//! new session that inherits everything up to the edited point; the
//! [`SessionHistoryMap`] holds every branch the runtime knows about and is
//! always replaced as a whole when a fresh snapshot arrives.

use crate::error::{CoreError, Result};
use crate::message::{Message, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monotonically assigned session number.
pub type SessionId = u64;

/// Evaluator outcome for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub passed: bool,
    /// Timestamp of the message that satisfied the evaluator
    #[serde(default)]
    pub first_timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ScoreResult {
    pub fn passed_at(timestamp: Timestamp) -> Self {
        Self {
            passed: true,
            first_timestamp: Some(timestamp),
            expected: None,
            actual: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            passed: false,
            first_timestamp: None,
            expected: None,
            actual: None,
        }
    }
}

/// One branch of conversation history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Messages with `timestamp <= fork_timestamp` were inherited from an
    /// earlier session.
    #[serde(
        default,
        rename = "current_session_reset_from",
        skip_serializing_if = "Option::is_none"
    )]
    pub fork_timestamp: Option<Timestamp>,
    /// Layout hint for where a successor session begins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_session_starts_at: Option<Timestamp>,
    #[serde(
        default,
        rename = "current_session_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<ScoreResult>,
}

impl Session {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn forked_from(messages: Vec<Message>, fork_timestamp: Timestamp) -> Self {
        Self {
            messages,
            fork_timestamp: Some(fork_timestamp),
            ..Default::default()
        }
    }

    pub fn with_score(mut self, score: ScoreResult) -> Self {
        self.score = Some(score);
        self
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn message_at(&self, timestamp: Timestamp) -> Option<&Message> {
        self.messages.iter().find(|m| m.timestamp == timestamp)
    }

    fn validate(&self, session_id: SessionId) -> Result<()> {
        for (index, pair) in self.messages.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(CoreError::UnorderedSession {
                    session_id,
                    index: index + 1,
                    previous: pair[0].timestamp,
                    timestamp: pair[1].timestamp,
                });
            }
        }
        Ok(())
    }
}

/// All sessions known to the runtime, keyed and ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistoryMap(BTreeMap<SessionId, Session>);

impl SessionHistoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SessionId, session: Session) -> Option<Session> {
        self.0.insert(id, session)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.0.get(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sessions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (SessionId, &Session)> {
        self.0.iter().map(|(id, session)| (*id, session))
    }

    pub fn session_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.0.keys().copied()
    }

    /// Every message of every session, in session then arrival order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.0.values().flat_map(|s| s.messages.iter())
    }

    /// Length of the longest session.
    pub fn max_len(&self) -> usize {
        self.0.values().map(Session::len).max().unwrap_or(0)
    }

    /// Check per-session ordering and that ids form one contiguous run.
    pub fn validate(&self) -> Result<()> {
        let mut expected = None;
        for (id, session) in self.iter() {
            if let Some(expected) = expected {
                if id != expected {
                    return Err(CoreError::NonContiguousSessions {
                        expected,
                        found: id,
                    });
                }
            }
            session.validate(id)?;
            expected = Some(id + 1);
        }
        Ok(())
    }
}

impl FromIterator<(SessionId, Session)> for SessionHistoryMap {
    fn from_iter<I: IntoIterator<Item = (SessionId, Session)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Full history as reported by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// The only session that accepts new messages
    pub current_session: SessionId,
    pub message_history: SessionHistoryMap,
}

impl HistorySnapshot {
    pub fn new(current_session: SessionId, message_history: SessionHistoryMap) -> Self {
        Self {
            current_session,
            message_history,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.message_history.get(self.current_session)
    }

    pub fn validate(&self) -> Result<()> {
        self.message_history.validate()?;
        if !self.message_history.is_empty() && self.current().is_none() {
            return Err(CoreError::MissingCurrentSession(self.current_session));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::payload::Payload;
    use serde_json::json;

    fn msg(ts: Timestamp) -> Message {
        Message::new(ts, MessageKind::Send, None, Some("b".into()), Payload::text_message("a", "x"))
    }

    #[test]
    fn test_snapshot_from_runtime_json() {
        let snapshot: HistorySnapshot = serde_json::from_value(json!({
            "current_session": 1,
            "message_history": {
                "0": {
                    "messages": [],
                    "current_session_reset_from": null,
                    "next_session_starts_at": null,
                    "current_session_score": {"passed": false, "first_timestamp": null}
                },
                "1": {
                    "messages": [{
                        "type": "PublishMessageEnvelope",
                        "message": {"type": "GroupChatStart"},
                        "sender": null,
                        "recipient": null,
                        "timestamp": 0
                    }],
                    "current_session_reset_from": 0
                }
            }
        }))
        .unwrap();

        assert_eq!(snapshot.message_history.len(), 2);
        assert_eq!(snapshot.current().unwrap().fork_timestamp, Some(0));
        assert_eq!(
            snapshot.message_history.get(0).unwrap().score,
            Some(ScoreResult::failed())
        );
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_iteration_is_ordered_by_id() {
        let map: SessionHistoryMap = vec![
            (2, Session::default()),
            (0, Session::default()),
            (1, Session::default()),
        ]
        .into_iter()
        .collect();
        let ids: Vec<_> = map.session_ids().collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_rejects_unordered_session() {
        let mut map = SessionHistoryMap::new();
        map.insert(0, Session::new(vec![msg(1), msg(3), msg(2)]));
        assert_eq!(
            map.validate(),
            Err(CoreError::UnorderedSession {
                session_id: 0,
                index: 2,
                previous: 3,
                timestamp: 2
            })
        );
    }

    #[test]
    fn test_validate_rejects_gaps() {
        let mut map = SessionHistoryMap::new();
        map.insert(0, Session::default());
        map.insert(2, Session::default());
        assert_eq!(
            map.validate(),
            Err(CoreError::NonContiguousSessions {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn test_missing_current_session() {
        let mut map = SessionHistoryMap::new();
        map.insert(0, Session::default());
        let snapshot = HistorySnapshot::new(3, map);
        assert_eq!(
            snapshot.validate(),
            Err(CoreError::MissingCurrentSession(3))
        );
    }

    #[test]
    fn test_max_len() {
        let mut map = SessionHistoryMap::new();
        assert_eq!(map.max_len(), 0);
        map.insert(0, Session::new(vec![msg(1), msg(2)]));
        map.insert(1, Session::new(vec![msg(1), msg(2), msg(5)]));
        assert_eq!(map.max_len(), 3);
        assert_eq!(map.messages().count(), 5);
    }
}
