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

//! Message envelopes exchanged between agents.

use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical time of a message. Unique across all sessions and doubles as the
/// message identity.
pub type Timestamp = u64;

/// Outer envelope shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "PublishMessageEnvelope", alias = "Publish")]
    Publish,
    #[serde(rename = "SendMessageEnvelope", alias = "Send")]
    Send,
    #[serde(rename = "ResponseMessageEnvelope", alias = "Response")]
    Response,
    #[serde(rename = "ThoughtMessage", alias = "Thought")]
    Thought,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::Publish => "Publish",
            MessageKind::Send => "Send",
            MessageKind::Response => "Response",
            MessageKind::Thought => "Thought",
        }
    }

    /// Only publish and send envelopes can be re-dispatched with new content.
    pub fn is_editable(self) -> bool {
        matches!(self, MessageKind::Publish | MessageKind::Send)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One exchange between agents at a point in logical time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(rename = "message")]
    pub payload: Payload,
    /// Set when the runtime discarded the message instead of delivering it
    #[serde(default, rename = "drop", skip_serializing_if = "Option::is_none")]
    pub dropped: Option<bool>,
}

impl Message {
    pub fn new(
        timestamp: Timestamp,
        kind: MessageKind,
        sender: Option<String>,
        recipient: Option<String>,
        payload: Payload,
    ) -> Self {
        Self {
            timestamp,
            kind,
            sender,
            recipient,
            payload,
            dropped: None,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.kind.is_editable()
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.unwrap_or(false)
    }

    /// Sender as shown to the operator.
    pub fn display_sender(&self) -> Option<&str> {
        match self.kind {
            MessageKind::Publish | MessageKind::Send => {
                Some(self.sender.as_deref().unwrap_or("User"))
            }
            MessageKind::Response | MessageKind::Thought => self.sender.as_deref(),
        }
    }

    /// Recipient as shown to the operator.
    pub fn display_recipient(&self) -> Option<&str> {
        match self.kind {
            MessageKind::Publish => Some("Group"),
            MessageKind::Send => Some(self.recipient.as_deref().unwrap_or("Unknown")),
            MessageKind::Response => Some(self.recipient.as_deref().unwrap_or("User")),
            MessageKind::Thought => None,
        }
    }

    /// `"Send - TextMessage"` style header.
    pub fn type_label(&self) -> String {
        match self.payload.type_tag() {
            Some(inner) => format!("{} - {}", self.kind, inner),
            None => self.kind.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_runtime_envelope() {
        let message: Message = serde_json::from_value(json!({
            "type": "SendMessageEnvelope",
            "message": {"type": "TextMessage", "source": "user", "content": "hi"},
            "sender": null,
            "recipient": "coder",
            "timestamp": 4,
            "id": 1234
        }))
        .unwrap();

        assert_eq!(message.kind, MessageKind::Send);
        assert_eq!(message.timestamp, 4);
        assert_eq!(message.recipient.as_deref(), Some("coder"));
        assert!(!message.is_dropped());
    }

    #[test]
    fn test_short_kind_aliases() {
        let kind: MessageKind = serde_json::from_value(json!("Publish")).unwrap();
        assert_eq!(kind, MessageKind::Publish);
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            json!("PublishMessageEnvelope")
        );
    }

    #[test]
    fn test_display_participants_defaults() {
        let publish = Message::new(1, MessageKind::Publish, None, None, Payload::Text(String::new()));
        assert_eq!(publish.display_sender(), Some("User"));
        assert_eq!(publish.display_recipient(), Some("Group"));

        let send = Message::new(2, MessageKind::Send, Some("a".into()), None, Payload::Text(String::new()));
        assert_eq!(send.display_sender(), Some("a"));
        assert_eq!(send.display_recipient(), Some("Unknown"));

        let response = Message::new(3, MessageKind::Response, Some("b".into()), None, Payload::Text(String::new()));
        assert_eq!(response.display_recipient(), Some("User"));
        assert!(!response.is_editable());
    }

    #[test]
    fn test_type_label() {
        let m = Message::new(
            1,
            MessageKind::Send,
            None,
            Some("b".into()),
            Payload::text_message("a", "x"),
        );
        assert_eq!(m.type_label(), "Send - TextMessage");
    }
}
