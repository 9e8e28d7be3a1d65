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

//! Geometry emitted by the layout engine.

use crate::message::Timestamp;
use crate::palette::{Color, LegendEntry};
use crate::session::{ScoreResult, SessionId};
use serde::Serialize;

/// Evaluator outcome shown above a session column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreGlyph {
    Unscored,
    Passed,
    Failed,
}

impl ScoreGlyph {
    pub fn from_score(score: Option<&ScoreResult>) -> Self {
        match score {
            None => ScoreGlyph::Unscored,
            Some(s) if s.passed => ScoreGlyph::Passed,
            Some(_) => ScoreGlyph::Failed,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ScoreGlyph::Unscored => "❔",
            ScoreGlyph::Passed => "✅",
            ScoreGlyph::Failed => "❌",
        }
    }
}

/// One categorical band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionColumn {
    pub session_id: SessionId,
    /// Left edge of the band
    pub x: f64,
    pub width: f64,
    pub label_y: f64,
    pub score_y: f64,
    pub is_current: bool,
    pub score: ScoreGlyph,
    pub message_count: usize,
}

/// One (session, message) node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeGlyph {
    pub session_id: SessionId,
    /// Position within the session, also the row slot
    pub index: usize,
    pub timestamp: Timestamp,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Color,
    pub stroke: Color,
    pub opacity: f64,
    /// Inherited from an earlier session
    pub inherited: bool,
    /// Equal to the hovered message
    pub highlighted: bool,
    /// Fails the active filter
    pub suppressed: bool,
    pub dropped: bool,
}

impl NodeGlyph {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Weight class of a same-session connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorWeight {
    /// Leads into an inherited message
    Inherited,
    /// Leads into a message owned by the session
    New,
}

/// Vertical line between rows `index - 1` and `index` of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connector {
    pub session_id: SessionId,
    pub index: usize,
    pub x: f64,
    pub y1: f64,
    pub y2: f64,
    pub weight: ConnectorWeight,
}

/// Discontinuity tick drawn left of the first new message of a forked session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetMarker {
    pub session_id: SessionId,
    pub index: usize,
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
}

/// Complete timeline geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub width: f64,
    pub height: f64,
    /// Number of row slots spanned by the ordinal axis
    pub slot_extent: usize,
    pub columns: Vec<SessionColumn>,
    pub nodes: Vec<NodeGlyph>,
    pub connectors: Vec<Connector>,
    pub reset_markers: Vec<ResetMarker>,
    pub legend: Vec<LegendEntry>,
}

impl TimelineLayout {
    /// Node under a point, if any.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&NodeGlyph> {
        self.nodes.iter().find(|n| n.contains(x, y))
    }

    pub fn column(&self, session_id: SessionId) -> Option<&SessionColumn> {
        self.columns.iter().find(|c| c.session_id == session_id)
    }

    pub fn nodes_of(&self, session_id: SessionId) -> impl Iterator<Item = &NodeGlyph> {
        self.nodes.iter().filter(move |n| n.session_id == session_id)
    }
}
