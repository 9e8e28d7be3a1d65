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

//! Agents taking part in a local run.

use agentdebug_core::{Message, MessageKind, Payload};
use serde_json::Value;

/// A message a participant wants delivered. The runtime stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub kind: MessageKind,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub payload: Payload,
}

impl Outgoing {
    pub fn publish(sender: &str, payload: Payload) -> Self {
        Self {
            kind: MessageKind::Publish,
            sender: Some(sender.to_string()),
            recipient: None,
            payload,
        }
    }

    pub fn send(sender: &str, recipient: &str, payload: Payload) -> Self {
        Self {
            kind: MessageKind::Send,
            sender: Some(sender.to_string()),
            recipient: Some(recipient.to_string()),
            payload,
        }
    }

    pub fn respond(sender: &str, recipient: Option<&str>, payload: Payload) -> Self {
        Self {
            kind: MessageKind::Response,
            sender: Some(sender.to_string()),
            recipient: recipient.map(str::to_string),
            payload,
        }
    }

    pub fn thought(sender: &str, text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Thought,
            sender: Some(sender.to_string()),
            recipient: None,
            payload: Payload::Text(text.into()),
        }
    }
}

/// An agent registered with the local runtime.
pub trait Participant: Send + Sync {
    fn name(&self) -> &str;

    /// React to a delivered message.
    fn on_message(&self, message: &Message) -> Vec<Outgoing>;

    /// Whether `message` is addressed to this participant.
    ///
    /// Published messages reach everyone but their sender; sent messages
    /// reach their recipient; responses and thoughts are only recorded.
    fn receives(&self, message: &Message) -> bool {
        match message.kind {
            MessageKind::Publish => message.sender.as_deref() != Some(self.name()),
            MessageKind::Send => message.recipient.as_deref() == Some(self.name()),
            MessageKind::Response | MessageKind::Thought => false,
        }
    }

    /// Snapshot of internal state, taken before every delivery.
    ///
    /// Stateless participants return `None` and are never restored.
    fn save_state(&self) -> Option<Value> {
        None
    }

    /// Restore a snapshot produced by [`Participant::save_state`].
    fn load_state(&self, _state: &Value) {}
}

/// Participant backed by a closure.
pub struct FnParticipant<F> {
    name: String,
    handler: F,
}

impl<F> FnParticipant<F>
where
    F: Fn(&Message) -> Vec<Outgoing> + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> Participant for FnParticipant<F>
where
    F: Fn(&Message) -> Vec<Outgoing> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_message(&self, message: &Message) -> Vec<Outgoing> {
        (self.handler)(message)
    }
}
