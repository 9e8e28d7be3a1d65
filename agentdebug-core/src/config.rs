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

//! Timeline configuration
//!
//! Geometry and colors can be overridden from a `[timeline]` table; every
//! field has a default so partial tables are fine.

use crate::palette::Palette;
use serde::{Deserialize, Serialize};

/// Geometry of the timeline chart, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Outer padding on the top and left edges
    #[serde(default = "default_padding")]
    pub padding: f64,

    #[serde(default = "default_node_width")]
    pub node_width: f64,

    #[serde(default = "default_node_height")]
    pub node_height: f64,

    /// Horizontal gap between session columns
    #[serde(default = "default_column_gap")]
    pub column_gap: f64,

    /// Vertical gap between message rows
    #[serde(default = "default_row_gap")]
    pub row_gap: f64,

    /// Height reserved for the session labels
    #[serde(default = "default_axis_space")]
    pub axis_space: f64,

    /// Height reserved for the pass/fail glyphs
    #[serde(default = "default_score_space")]
    pub score_space: f64,

    /// How far a reset marker stops short of the previous column
    #[serde(default = "default_reset_marker_inset")]
    pub reset_marker_inset: f64,

    /// Opacity of inherited or filtered-out nodes
    #[serde(default = "default_dimmed_opacity")]
    pub dimmed_opacity: f64,
}

fn default_padding() -> f64 {
    10.0
}

fn default_node_width() -> f64 {
    20.0
}

fn default_node_height() -> f64 {
    10.0
}

fn default_column_gap() -> f64 {
    15.0
}

fn default_row_gap() -> f64 {
    6.0
}

fn default_axis_space() -> f64 {
    25.0
}

fn default_score_space() -> f64 {
    25.0
}

fn default_reset_marker_inset() -> f64 {
    3.0
}

fn default_dimmed_opacity() -> f64 {
    0.1
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            node_width: default_node_width(),
            node_height: default_node_height(),
            column_gap: default_column_gap(),
            row_gap: default_row_gap(),
            axis_space: default_axis_space(),
            score_space: default_score_space(),
            reset_marker_inset: default_reset_marker_inset(),
            dimmed_opacity: default_dimmed_opacity(),
        }
    }
}

impl LayoutConfig {
    /// Distance between the left edges of two adjacent columns.
    pub fn column_step(&self) -> f64 {
        self.node_width + self.column_gap
    }

    /// Distance between the top edges of two adjacent rows.
    pub fn row_step(&self) -> f64 {
        self.node_height + self.row_gap
    }
}

/// Everything the timeline needs besides the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub palette: Palette,
}
