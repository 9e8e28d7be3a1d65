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

//! Message classification by semantic field.

use crate::message::Message;
use crate::payload::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category reported for messages without an inner type tag.
pub const THOUGHT_CATEGORY: &str = "Thought";

/// Field used to color-encode and filter messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorField {
    None,
    #[default]
    Type,
    Sender,
    Recipient,
}

impl ColorField {
    pub const ALL: [ColorField; 4] = [
        ColorField::None,
        ColorField::Type,
        ColorField::Sender,
        ColorField::Recipient,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorField::None => "none",
            ColorField::Type => "type",
            ColorField::Sender => "sender",
            ColorField::Recipient => "recipient",
        }
    }
}

impl fmt::Display for ColorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let expected: Vec<&str> = ColorField::ALL.iter().map(|f| f.as_str()).collect();
                format!(
                    "unknown color field '{}', expected one of {}",
                    s,
                    expected.join(", ")
                )
            })
    }
}

/// Classification value of `message` under `field`.
///
/// Never fails: payloads without a type tag classify as
/// [`THOUGHT_CATEGORY`], absent participants as `None`, and the `none` field
/// yields `None` for every message.
pub fn extract(message: &Message, field: ColorField) -> Option<&str> {
    match field {
        ColorField::None => None,
        ColorField::Type => Some(match &message.payload {
            Payload::Structured { kind, .. } => kind.as_str(),
            Payload::Text(_) | Payload::Opaque(_) => THOUGHT_CATEGORY,
        }),
        ColorField::Sender => message.sender.as_deref(),
        ColorField::Recipient => message.recipient.as_deref(),
    }
}
