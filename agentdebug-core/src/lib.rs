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

//! Agentdebug Core
//!
//! Session timeline model for multi-agent message histories: messages and
//! their payload registry, sessions and forks, classification, color
//! assignment, filtering, and the timeline layout.

pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod message;
pub mod overview;
pub mod palette;
pub mod payload;
pub mod reset;
pub mod session;
pub mod timeline;

pub use classify::{extract, ColorField, THOUGHT_CATEGORY};
pub use config::{LayoutConfig, TimelineConfig};
pub use error::{CoreError, Result};
pub use filter::{FilterState, HoverState, Selection};
pub use message::{Message, MessageKind, Timestamp};
pub use overview::Overview;
pub use palette::{Color, ColorScale, LegendEntry, Palette};
pub use payload::{Payload, PayloadType};
pub use reset::{is_inherited, locate, locate_all, ResetMap};
pub use session::{HistorySnapshot, ScoreResult, Session, SessionHistoryMap, SessionId};
pub use timeline::{
    render_svg, Connector, ConnectorWeight, LayoutContext, NodeGlyph, ResetMarker, ScoreGlyph,
    SessionColumn, TimelineEngine, TimelineLayout,
};
