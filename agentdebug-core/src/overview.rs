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

//! Conversation overview: the timeline plus the companion message list.

use crate::config::TimelineConfig;
use crate::filter::{FilterState, HoverState};
use crate::message::Message;
use crate::reset::{locate_all, ResetMap};
use crate::session::{HistorySnapshot, SessionId};
use crate::timeline::{LayoutContext, TimelineEngine, TimelineLayout};
use serde::Serialize;

/// Everything needed to draw one frame of the overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub current_session: SessionId,
    pub layout: TimelineLayout,
    /// Reset index per forked session
    pub resets: ResetMap,
    /// Visible messages of the current session, in order
    pub current_messages: Vec<Message>,
}

impl Overview {
    pub fn build(
        snapshot: &HistorySnapshot,
        filter: &FilterState,
        hover: HoverState,
        config: &TimelineConfig,
    ) -> Self {
        let engine = TimelineEngine::new(config.clone());
        let layout = engine.layout(
            &snapshot.message_history,
            LayoutContext {
                current_session: Some(snapshot.current_session),
                filter,
                hover,
            },
        );

        let current_messages = snapshot
            .current()
            .map(|session| filter.filter_session(session).cloned().collect())
            .unwrap_or_default();

        Self {
            current_session: snapshot.current_session,
            layout,
            resets: locate_all(&snapshot.message_history),
            current_messages,
        }
    }

    /// Undimmed nodes in the current session's column. Always equal to
    /// `current_messages.len()`.
    pub fn visible_node_count(&self) -> usize {
        self.layout
            .nodes
            .iter()
            .filter(|n| n.session_id == self.current_session && !n.suppressed)
            .count()
    }
}
