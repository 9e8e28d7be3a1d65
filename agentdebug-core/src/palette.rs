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

//! Ordinal color assignment for classification values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// CSS color string, usually `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tableau-10 without orange.
const DEFAULT_RANGE: [&str; 8] = [
    "#4e79a7", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7", "#9c755f",
];

/// Colors used by the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Ordinal range assigned to sorted classification values
    #[serde(default = "default_range")]
    pub range: Vec<Color>,

    /// Sentinel for missing values (gray-400)
    #[serde(default = "default_missing")]
    pub missing: Color,

    /// Node color when no field is active
    #[serde(default = "default_primary")]
    pub primary: Color,

    /// Hovered node when no field is active
    #[serde(default = "default_highlight")]
    pub highlight: Color,

    /// Hovered node while a field is active
    #[serde(default = "default_field_highlight")]
    pub field_highlight: Color,
}

fn default_range() -> Vec<Color> {
    DEFAULT_RANGE.iter().map(|c| Color::new(*c)).collect()
}

fn default_missing() -> Color {
    Color::new("#9ca3af")
}

fn default_primary() -> Color {
    Color::new("#0e7490")
}

fn default_highlight() -> Color {
    Color::new("#f59e0b")
}

fn default_field_highlight() -> Color {
    Color::new("#000000")
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            range: default_range(),
            missing: default_missing(),
            primary: default_primary(),
            highlight: default_highlight(),
            field_highlight: default_field_highlight(),
        }
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// `None` is the missing-value row
    pub value: Option<String>,
    pub color: Color,
}

/// Value to color mapping for one classification field.
///
/// Built from the distinct values of the current message set: values are
/// sorted and take palette colors by index, wrapping when there are more
/// values than colors. Rebuild it whenever the field or the messages change.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    domain: Vec<String>,
    has_missing: bool,
    range: Vec<Color>,
    missing: Color,
}

impl ColorScale {
    pub fn build<'a, I>(values: I, palette: &Palette) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut distinct = BTreeSet::new();
        let mut has_missing = false;
        for value in values {
            match value {
                Some(v) if !v.is_empty() => {
                    distinct.insert(v.to_string());
                }
                _ => has_missing = true,
            }
        }

        let range = if palette.range.is_empty() {
            vec![palette.missing.clone()]
        } else {
            palette.range.clone()
        };

        Self {
            domain: distinct.into_iter().collect(),
            has_missing,
            range,
            missing: palette.missing.clone(),
        }
    }

    /// Color for a value; missing, empty and unseen values get the sentinel.
    pub fn color_for(&self, value: Option<&str>) -> &Color {
        match value {
            Some(v) if !v.is_empty() => match self.domain.binary_search_by(|d| d.as_str().cmp(v)) {
                Ok(index) => &self.range[index % self.range.len()],
                Err(_) => &self.missing,
            },
            _ => &self.missing,
        }
    }

    /// Sorted distinct values.
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut entries: Vec<LegendEntry> = self
            .domain
            .iter()
            .enumerate()
            .map(|(index, value)| LegendEntry {
                value: Some(value.clone()),
                color: self.range[index % self.range.len()].clone(),
            })
            .collect();
        if self.has_missing {
            entries.push(LegendEntry {
                value: None,
                color: self.missing.clone(),
            });
        }
        entries
    }
}
