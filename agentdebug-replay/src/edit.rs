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

//! Edit slot state machine.
//!
//! One slot per editable message on screen, keyed either by queue position
//! or by history timestamp:
//!
//! ```text
//! Viewing --set_draft--> Editing --begin_save--> Saving --ok--> Viewing
//!                           ^                       |
//!                           +--------- err ---------+
//! Viewing/Editing --begin_revert--> Discarding --> Viewing
//! ```
//!
//! Slots never talk to the store themselves; the controller drives them.

use crate::error::{EditError, StoreResult};
use agentdebug_core::{Message, Payload, Timestamp};
use serde::Serialize;

/// Where an edit is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditTarget {
    /// Position in the pending queue
    Queue(usize),
    /// Timestamp of a message in the current session
    History(Timestamp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Viewing,
    Editing,
    Saving,
    Discarding,
}

impl SlotState {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotState::Viewing => "viewing",
            SlotState::Editing => "editing",
            SlotState::Saving => "saving",
            SlotState::Discarding => "discarding",
        }
    }

    /// A request for this slot is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, SlotState::Saving | SlotState::Discarding)
    }
}

/// Local editing state for one message.
#[derive(Debug, Clone)]
pub struct EditSlot {
    target: EditTarget,
    message: Message,
    draft: String,
    state: SlotState,
    pending: Option<Payload>,
    error: Option<String>,
}

impl EditSlot {
    pub fn new(target: EditTarget, message: Message) -> Self {
        let draft = message.payload.to_draft();
        Self {
            target,
            message,
            draft,
            state: SlotState::Viewing,
            pending: None,
            error: None,
        }
    }

    pub fn for_queue(index: usize, message: Message) -> Self {
        Self::new(EditTarget::Queue(index), message)
    }

    pub fn for_history(message: Message) -> Self {
        Self::new(EditTarget::History(message.timestamp), message)
    }

    pub fn target(&self) -> EditTarget {
        self.target
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Last-synced message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Error from the last failed save or revert.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn original_draft(&self) -> String {
        self.message.payload.to_draft()
    }

    fn settle(&mut self) {
        self.state = if self.draft == self.original_draft() {
            SlotState::Viewing
        } else {
            SlotState::Editing
        };
    }

    fn require(&self, action: &'static str, allowed: &[SlotState]) -> Result<(), EditError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EditError::InvalidState {
                action,
                state: self.state.as_str(),
            })
        }
    }

    /// Replace the draft text.
    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<(), EditError> {
        if !self.message.is_editable() {
            return Err(EditError::NotEditable(self.message.kind));
        }
        self.require("edit", &[SlotState::Viewing, SlotState::Editing])?;
        self.draft = text.into();
        self.error = None;
        self.settle();
        Ok(())
    }

    /// Throw the draft away locally.
    pub fn undo(&mut self) -> Result<(), EditError> {
        self.require("undo", &[SlotState::Viewing, SlotState::Editing])?;
        self.draft = self.original_draft();
        self.error = None;
        self.state = SlotState::Viewing;
        Ok(())
    }

    /// Parse the draft and enter `Saving`.
    ///
    /// A draft that does not parse keeps the slot in `Editing` with the
    /// error recorded and the draft untouched.
    pub fn begin_save(&mut self) -> Result<Payload, EditError> {
        self.require("save", &[SlotState::Editing])?;
        match Payload::parse_draft(&self.draft) {
            Ok(payload) => {
                self.pending = Some(payload.clone());
                self.error = None;
                self.state = SlotState::Saving;
                Ok(payload)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(EditError::Malformed(e))
            }
        }
    }

    pub fn finish_save(&mut self, outcome: &StoreResult<()>) {
        if self.state != SlotState::Saving {
            return;
        }
        let pending = self.pending.take();
        match (outcome, pending) {
            (Ok(()), Some(payload)) => {
                self.message.payload = payload;
                self.draft = self.original_draft();
                self.error = None;
                self.state = SlotState::Viewing;
            }
            (Ok(()), None) => self.settle(),
            (Err(e), _) => {
                self.error = Some(e.to_string());
                self.state = SlotState::Editing;
            }
        }
    }

    /// Enter `Discarding` for a rewind to just before this message.
    pub fn begin_revert(&mut self) -> Result<Timestamp, EditError> {
        let EditTarget::History(timestamp) = self.target else {
            return Err(EditError::NotRevertible);
        };
        if !self.message.is_editable() {
            return Err(EditError::NotEditable(self.message.kind));
        }
        self.require("revert", &[SlotState::Viewing, SlotState::Editing])?;
        self.error = None;
        self.state = SlotState::Discarding;
        Ok(timestamp)
    }

    pub fn finish_revert(&mut self, outcome: &StoreResult<()>) {
        if self.state != SlotState::Discarding {
            return;
        }
        match outcome {
            Ok(()) => {
                self.draft = self.original_draft();
                self.error = None;
                self.state = SlotState::Viewing;
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.settle();
            }
        }
    }

    /// Take in the message as it appears in a fresh snapshot.
    ///
    /// A viewing slot follows the store. An editing slot keeps its draft. In
    /// flight slots ignore the update.
    pub fn sync(&mut self, message: Message) {
        if self.state.is_in_flight() || self.message == message {
            return;
        }
        let viewing = self.state == SlotState::Viewing;
        self.message = message;
        if viewing {
            self.draft = self.original_draft();
        } else {
            self.settle();
        }
    }
}
