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

//! Inner message payloads.
//!
//! A payload is the structured value an agent actually exchanged. The runtime
//! tags it with a `type` name; the names the debugger understands form a
//! closed registry ([`PayloadType`]) with [`PayloadType::Other`] catching every
//! tag it has never heard of. Fields stay schema-less JSON.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Tag used by the runtime for an absent inner message.
const EMPTY_TAG: &str = "None";

/// Declared inner message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PayloadType {
    // agent chat messages
    TextMessage,
    MultiModalMessage,
    StopMessage,
    HandoffMessage,
    // agent chat events
    ToolCallRequestEvent,
    ToolCallExecutionEvent,
    ToolCallSummaryMessage,
    UserInputRequestedEvent,
    MemoryQueryEvent,
    // group chat control
    GroupChatStart,
    GroupChatAgentResponse,
    GroupChatRequestPublish,
    GroupChatMessage,
    GroupChatTermination,
    GroupChatReset,
    // model messages
    AssistantMessage,
    FunctionExecutionResult,
    FunctionExecutionResultMessage,
    SystemMessage,
    UserMessage,
    /// The `"None"` tag
    Empty,
    /// Any tag outside the registry
    Other(String),
}

impl PayloadType {
    /// Resolve a declared type name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "TextMessage" => Self::TextMessage,
            "MultiModalMessage" => Self::MultiModalMessage,
            "StopMessage" => Self::StopMessage,
            "HandoffMessage" => Self::HandoffMessage,
            "ToolCallRequestEvent" => Self::ToolCallRequestEvent,
            "ToolCallExecutionEvent" => Self::ToolCallExecutionEvent,
            "ToolCallSummaryMessage" => Self::ToolCallSummaryMessage,
            "UserInputRequestedEvent" => Self::UserInputRequestedEvent,
            "MemoryQueryEvent" => Self::MemoryQueryEvent,
            "GroupChatStart" => Self::GroupChatStart,
            "GroupChatAgentResponse" => Self::GroupChatAgentResponse,
            "GroupChatRequestPublish" => Self::GroupChatRequestPublish,
            "GroupChatMessage" => Self::GroupChatMessage,
            "GroupChatTermination" => Self::GroupChatTermination,
            "GroupChatReset" => Self::GroupChatReset,
            "AssistantMessage" => Self::AssistantMessage,
            "FunctionExecutionResult" => Self::FunctionExecutionResult,
            "FunctionExecutionResultMessage" => Self::FunctionExecutionResultMessage,
            "SystemMessage" => Self::SystemMessage,
            "UserMessage" => Self::UserMessage,
            EMPTY_TAG => Self::Empty,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TextMessage => "TextMessage",
            Self::MultiModalMessage => "MultiModalMessage",
            Self::StopMessage => "StopMessage",
            Self::HandoffMessage => "HandoffMessage",
            Self::ToolCallRequestEvent => "ToolCallRequestEvent",
            Self::ToolCallExecutionEvent => "ToolCallExecutionEvent",
            Self::ToolCallSummaryMessage => "ToolCallSummaryMessage",
            Self::UserInputRequestedEvent => "UserInputRequestedEvent",
            Self::MemoryQueryEvent => "MemoryQueryEvent",
            Self::GroupChatStart => "GroupChatStart",
            Self::GroupChatAgentResponse => "GroupChatAgentResponse",
            Self::GroupChatRequestPublish => "GroupChatRequestPublish",
            Self::GroupChatMessage => "GroupChatMessage",
            Self::GroupChatTermination => "GroupChatTermination",
            Self::GroupChatReset => "GroupChatReset",
            Self::AssistantMessage => "AssistantMessage",
            Self::FunctionExecutionResult => "FunctionExecutionResult",
            Self::FunctionExecutionResultMessage => "FunctionExecutionResultMessage",
            Self::SystemMessage => "SystemMessage",
            Self::UserMessage => "UserMessage",
            Self::Empty => EMPTY_TAG,
            Self::Other(name) => name,
        }
    }

    /// Fields a hand-written payload of this type must carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::TextMessage | Self::StopMessage | Self::MultiModalMessage => {
                &["source", "content"]
            }
            Self::HandoffMessage => &["source", "content", "target"],
            Self::GroupChatAgentResponse => &["agent_response"],
            Self::GroupChatMessage | Self::GroupChatTermination => &["message"],
            Self::SystemMessage | Self::UserMessage | Self::AssistantMessage => &["content"],
            Self::ToolCallRequestEvent
            | Self::ToolCallExecutionEvent
            | Self::ToolCallSummaryMessage
            | Self::UserInputRequestedEvent
            | Self::MemoryQueryEvent
            | Self::GroupChatStart
            | Self::GroupChatRequestPublish
            | Self::GroupChatReset
            | Self::FunctionExecutionResult
            | Self::FunctionExecutionResultMessage
            | Self::Empty
            | Self::Other(_) => &[],
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inner message carried by an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Payload {
    /// Object with a string `type` tag; `fields` excludes the tag.
    Structured {
        kind: PayloadType,
        fields: Map<String, Value>,
    },
    /// Bare text, as produced for agent thoughts.
    Text(String),
    /// Anything without a usable tag.
    Opaque(Value),
}

impl Payload {
    pub fn structured(kind: PayloadType, fields: Map<String, Value>) -> Self {
        Payload::Structured { kind, fields }
    }

    /// Shorthand for a `TextMessage` from `source`.
    pub fn text_message(source: &str, content: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("source".to_string(), Value::String(source.to_string()));
        fields.insert("content".to_string(), Value::String(content.to_string()));
        Payload::Structured {
            kind: PayloadType::TextMessage,
            fields,
        }
    }

    /// The declared type tag, if the payload carries one.
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            Payload::Structured { kind, .. } => Some(kind.as_str()),
            Payload::Text(_) | Payload::Opaque(_) => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Payload::Structured { fields, .. } => fields.get(name),
            Payload::Opaque(Value::Object(map)) => map.get(name),
            Payload::Text(_) | Payload::Opaque(_) => None,
        }
    }

    /// Human readable content: the `content` field when it is text, the
    /// whole text for thoughts, otherwise the JSON rendering.
    pub fn content_text(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            _ => match self.field("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => Value::from(self.clone()).to_string(),
            },
        }
    }

    /// Parse an operator-edited draft.
    ///
    /// The draft must be a JSON object with a string `type` tag and every
    /// field the registry requires for that type.
    pub fn parse_draft(draft: &str) -> Result<Payload> {
        let value: Value = serde_json::from_str(draft)
            .map_err(|e| CoreError::MalformedPayload(format!("invalid JSON: {}", e)))?;

        let Value::Object(map) = value else {
            return Err(CoreError::MalformedPayload(
                "payload must be a JSON object".to_string(),
            ));
        };

        match map.get("type") {
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(CoreError::MalformedPayload(
                    "`type` must be a string".to_string(),
                ))
            }
            None => {
                return Err(CoreError::MalformedPayload(
                    "missing `type` tag".to_string(),
                ))
            }
        }

        let payload = Payload::from(Value::Object(map));
        if let Payload::Structured { kind, fields } = &payload {
            if let Some(missing) = kind
                .required_fields()
                .iter()
                .find(|name| !fields.contains_key(**name))
            {
                return Err(CoreError::MalformedPayload(format!(
                    "{} requires field `{}`",
                    kind, missing
                )));
            }
        }
        Ok(payload)
    }

    /// Pretty JSON used to seed an edit draft.
    pub fn to_draft(&self) -> String {
        serde_json::to_string_pretty(&Value::from(self.clone()))
            .unwrap_or_else(|_| String::new())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Text(text),
            Value::Object(mut map) => match map.remove("type") {
                Some(Value::String(tag)) => Payload::Structured {
                    kind: PayloadType::from_name(&tag),
                    fields: map,
                },
                Some(other) => {
                    map.insert("type".to_string(), other);
                    Payload::Opaque(Value::Object(map))
                }
                None => Payload::Opaque(Value::Object(map)),
            },
            other => Payload::Opaque(other),
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Structured { kind, mut fields } => {
                fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));
                Value::Object(fields)
            }
            Payload::Text(text) => Value::String(text),
            Payload::Opaque(value) => value,
        }
    }
}
