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

//! SVG rendering of a [`TimelineLayout`].

use super::geometry::{ConnectorWeight, TimelineLayout};

const CONNECTOR_COLOR: &str = "#6b7280";
const RESET_COLOR: &str = "#dc2626";

/// Escape a value for use inside a double-quoted attribute.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render a layout as a standalone SVG document.
///
/// Draw order is score glyphs and labels, reset markers, connectors, then
/// nodes on top.
pub fn render_svg(layout: &TimelineLayout) -> String {
    let mut out = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">\n",
        layout.width, layout.height, layout.width, layout.height
    );

    for column in &layout.columns {
        let center = column.x + column.width / 2.0;
        out.push_str(&format!(
            "  <text class=\"score\" x=\"{}\" y=\"{}\" text-anchor=\"middle\" dominant-baseline=\"hanging\">{}</text>\n",
            center,
            column.score_y,
            column.score.symbol()
        ));
        let weight = if column.is_current { "bold" } else { "normal" };
        out.push_str(&format!(
            "  <text class=\"session\" x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-weight=\"{}\">{}</text>\n",
            center, column.label_y, weight, column.session_id
        ));
    }

    for marker in &layout.reset_markers {
        out.push_str(&format!(
            "  <line class=\"reset\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>\n",
            marker.x1, marker.y, marker.x2, marker.y, RESET_COLOR
        ));
    }

    for connector in &layout.connectors {
        let width = match connector.weight {
            ConnectorWeight::Inherited => 1,
            ConnectorWeight::New => 3,
        };
        out.push_str(&format!(
            "  <line class=\"connector\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
            connector.x, connector.y1, connector.x, connector.y2, CONNECTOR_COLOR, width
        ));
    }

    for node in &layout.nodes {
        let dash = if node.dropped {
            " stroke-dasharray=\"2 2\""
        } else {
            ""
        };
        out.push_str(&format!(
            "  <rect class=\"node\" data-session=\"{}\" data-timestamp=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" stroke=\"{}\" opacity=\"{}\"{}/>\n",
            node.session_id,
            node.timestamp,
            node.x,
            node.y,
            node.width,
            node.height,
            escape_attr(node.fill.as_str()),
            escape_attr(node.stroke.as_str()),
            node.opacity,
            dash
        ));
    }

    out.push_str("</svg>\n");
    out
}
