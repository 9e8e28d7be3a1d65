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

//! Timeline layout engine.
//!
//! Sessions become equal-width columns ordered by id; message positions
//! become rows on a scale shared by every column, so position 0 lines up
//! across sessions. The result is a pure function of its inputs.

use super::geometry::{
    Connector, ConnectorWeight, NodeGlyph, ResetMarker, ScoreGlyph, SessionColumn, TimelineLayout,
};
use crate::classify::{extract, ColorField};
use crate::config::{LayoutConfig, TimelineConfig};
use crate::filter::{FilterState, HoverState};
use crate::message::Message;
use crate::palette::{Color, ColorScale, Palette};
use crate::reset::{is_inherited, locate};
use crate::session::{SessionHistoryMap, SessionId};

/// Inputs besides the history itself.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext<'a> {
    pub current_session: Option<SessionId>,
    pub filter: &'a FilterState,
    pub hover: HoverState,
}

/// Computes [`TimelineLayout`]s for a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct TimelineEngine {
    config: TimelineConfig,
}

impl TimelineEngine {
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Color scale for the active field over every loaded message.
    pub fn color_scale(&self, history: &SessionHistoryMap, field: ColorField) -> ColorScale {
        if field == ColorField::None {
            return ColorScale::build(std::iter::empty(), &self.config.palette);
        }
        ColorScale::build(
            history.messages().map(|m| extract(m, field)),
            &self.config.palette,
        )
    }

    pub fn layout(&self, history: &SessionHistoryMap, ctx: LayoutContext<'_>) -> TimelineLayout {
        let geometry = &self.config.layout;
        let palette = &self.config.palette;
        let field = ctx.filter.field();
        let scale = self.color_scale(history, field);

        let slot_extent = history.max_len().saturating_sub(1);
        let rows = Rows::new(geometry);

        let mut columns = Vec::with_capacity(history.len());
        let mut nodes = Vec::new();
        let mut connectors = Vec::new();
        let mut reset_markers = Vec::new();

        for (band, (session_id, session)) in history.iter().enumerate() {
            let x = geometry.padding + band as f64 * geometry.column_step();

            columns.push(SessionColumn {
                session_id,
                x,
                width: geometry.node_width,
                label_y: geometry.padding + geometry.axis_space,
                score_y: geometry.padding,
                is_current: ctx.current_session == Some(session_id),
                score: ScoreGlyph::from_score(session.score.as_ref()),
                message_count: session.len(),
            });

            for (index, message) in session.messages.iter().enumerate() {
                let inherited = is_inherited(session, message);
                let highlighted = ctx.hover.is_hovered(message);
                let suppressed = !ctx.filter.is_visible(message);
                let color = node_color(message, field, highlighted, &scale, palette);
                let y = rows.top(index);

                nodes.push(NodeGlyph {
                    session_id,
                    index,
                    timestamp: message.timestamp,
                    x,
                    y,
                    width: geometry.node_width,
                    height: geometry.node_height,
                    fill: color.clone(),
                    stroke: color,
                    opacity: if inherited || suppressed {
                        geometry.dimmed_opacity
                    } else {
                        1.0
                    },
                    inherited,
                    highlighted,
                    suppressed,
                    dropped: message.is_dropped(),
                });

                if index > 0 {
                    connectors.push(Connector {
                        session_id,
                        index,
                        x: x + geometry.node_width / 2.0,
                        y1: rows.top(index - 1) + geometry.node_height,
                        y2: y,
                        weight: if inherited {
                            ConnectorWeight::Inherited
                        } else {
                            ConnectorWeight::New
                        },
                    });
                }
            }

            // A reset at index 0 means nothing was inherited: no marker
            if let Some(index) = locate(session).filter(|i| *i > 0) {
                reset_markers.push(ResetMarker {
                    session_id,
                    index,
                    x1: x - geometry.column_gap + geometry.reset_marker_inset,
                    x2: x,
                    y: rows.top(index) + geometry.node_height / 2.0,
                });
            }
        }

        tracing::trace!(
            sessions = columns.len(),
            nodes = nodes.len(),
            connectors = connectors.len(),
            "timeline layout computed"
        );

        TimelineLayout {
            width: geometry.padding + history.len() as f64 * geometry.column_step(),
            height: rows.top(slot_extent) + geometry.node_height + geometry.row_gap,
            slot_extent,
            columns,
            nodes,
            connectors,
            reset_markers,
            legend: scale.legend(),
        }
    }
}

/// Linear row scale shared by all columns.
struct Rows {
    origin: f64,
    step: f64,
}

impl Rows {
    fn new(geometry: &LayoutConfig) -> Self {
        Self {
            origin: geometry.padding + geometry.axis_space + geometry.score_space,
            step: geometry.row_step(),
        }
    }

    fn top(&self, slot: usize) -> f64 {
        self.origin + slot as f64 * self.step
    }
}

fn node_color(
    message: &Message,
    field: ColorField,
    highlighted: bool,
    scale: &ColorScale,
    palette: &Palette,
) -> Color {
    match (field, highlighted) {
        (ColorField::None, true) => palette.highlight.clone(),
        (ColorField::None, false) => palette.primary.clone(),
        (_, true) => palette.field_highlight.clone(),
        (field, false) => scale.color_for(extract(message, field)).clone(),
    }
}
