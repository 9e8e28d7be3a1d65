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

//! Filter and highlight state.
//!
//! The same visibility predicate drives two views: the message list drops
//! messages that fail it, the timeline keeps them but dims them.

use crate::classify::{extract, ColorField};
use crate::message::{Message, Timestamp};
use crate::session::{Session, SessionHistoryMap};
use serde::{Deserialize, Serialize};

/// A selected legend value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Value(String),
    /// The "null" legend row
    Missing,
}

impl Selection {
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) => Selection::Value(v.to_string()),
            None => Selection::Missing,
        }
    }

    fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Selection::Value(selected), Some(v)) => selected == v,
            (Selection::Missing, None) => true,
            _ => false,
        }
    }
}

/// Active classification field and optional selected value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    field: ColorField,
    selected: Option<Selection>,
}

impl FilterState {
    pub fn new(field: ColorField) -> Self {
        Self {
            field,
            selected: None,
        }
    }

    pub fn field(&self) -> ColorField {
        self.field
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    /// Switch field. Any selection is cleared, even when the field is unchanged.
    pub fn set_field(&mut self, field: ColorField) {
        self.field = field;
        self.selected = None;
    }

    /// Select `selection`, or clear it when it is already selected.
    pub fn toggle(&mut self, selection: Selection) {
        if self.selected.as_ref() == Some(&selection) {
            self.selected = None;
        } else {
            self.selected = Some(selection);
        }
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn is_filtering(&self) -> bool {
        self.selected.is_some() && self.field != ColorField::None
    }

    pub fn is_visible(&self, message: &Message) -> bool {
        match (&self.selected, self.field) {
            (None, _) | (_, ColorField::None) => true,
            (Some(selection), field) => selection.matches(extract(message, field)),
        }
    }

    /// Visible messages of one session, in order.
    pub fn filter_session<'a>(&'a self, session: &'a Session) -> impl Iterator<Item = &'a Message> + 'a {
        session.messages.iter().filter(move |m| self.is_visible(m))
    }

    /// Copy of `history` with hidden messages removed.
    pub fn filtered_view(&self, history: &SessionHistoryMap) -> SessionHistoryMap {
        history
            .iter()
            .map(|(id, session)| {
                let filtered = Session {
                    messages: self.filter_session(session).cloned().collect(),
                    ..session.clone()
                };
                (id, filtered)
            })
            .collect()
    }
}

/// Message currently under the pointer, shared by the list and the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoverState(Option<Timestamp>);

impl HoverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, timestamp: Timestamp) {
        self.0 = Some(timestamp);
    }

    pub fn leave(&mut self) {
        self.0 = None;
    }

    pub fn hovered(&self) -> Option<Timestamp> {
        self.0
    }

    pub fn is_hovered(&self, message: &Message) -> bool {
        self.0 == Some(message.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::payload::Payload;

    fn msg(ts: Timestamp, sender: Option<&str>) -> Message {
        Message::new(
            ts,
            MessageKind::Send,
            sender.map(str::to_string),
            Some("B".into()),
            Payload::text_message("x", "y"),
        )
    }

    #[test]
    fn test_double_toggle_returns_to_unfiltered() {
        let mut filter = FilterState::new(ColorField::Sender);
        let initial = filter.clone();
        filter.toggle(Selection::Value("A".into()));
        assert!(filter.is_filtering());
        filter.toggle(Selection::Value("A".into()));
        assert_eq!(filter, initial);
    }

    #[test]
    fn test_toggle_other_value_replaces_selection() {
        let mut filter = FilterState::new(ColorField::Sender);
        filter.toggle(Selection::Value("A".into()));
        filter.toggle(Selection::Value("B".into()));
        assert_eq!(filter.selected(), Some(&Selection::Value("B".into())));
    }

    #[test]
    fn test_changing_field_clears_selection() {
        let mut filter = FilterState::new(ColorField::Sender);
        filter.toggle(Selection::Value("A".into()));
        filter.set_field(ColorField::Recipient);
        assert_eq!(filter.selected(), None);

        filter.toggle(Selection::Value("B".into()));
        filter.set_field(ColorField::Recipient);
        assert_eq!(filter.selected(), None);
    }

    #[test]
    fn test_visibility_predicate() {
        let mut filter = FilterState::new(ColorField::Sender);
        let from_a = msg(1, Some("A"));
        let from_nobody = msg(2, None);
        assert!(filter.is_visible(&from_a) && filter.is_visible(&from_nobody));

        filter.toggle(Selection::Value("A".into()));
        assert!(filter.is_visible(&from_a));
        assert!(!filter.is_visible(&from_nobody));

        filter.toggle(Selection::Missing);
        assert!(!filter.is_visible(&from_a));
        assert!(filter.is_visible(&from_nobody));
    }

    #[test]
    fn test_field_none_shows_everything() {
        let mut filter = FilterState::new(ColorField::None);
        filter.toggle(Selection::Value("A".into()));
        assert!(filter.is_visible(&msg(1, Some("Z"))));
        assert!(!filter.is_filtering());
    }

    #[test]
    fn test_filtered_view_keeps_session_metadata() {
        let mut history = SessionHistoryMap::new();
        history.insert(
            0,
            Session::forked_from(vec![msg(1, Some("A")), msg(2, Some("C"))], 1),
        );
        let mut filter = FilterState::new(ColorField::Sender);
        filter.toggle(Selection::Value("C".into()));

        let view = filter.filtered_view(&history);
        let session = view.get(0).unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(session.fork_timestamp, Some(1));
    }

    #[test]
    fn test_hover_state() {
        let mut hover = HoverState::new();
        hover.enter(4);
        assert!(hover.is_hovered(&msg(4, None)));
        hover.leave();
        assert_eq!(hover.hovered(), None);
    }
}
