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

//! Session scoring.

use agentdebug_core::{Message, ScoreResult};

/// Evaluates the live session each time history is fetched.
pub trait Scorer: Send + Sync {
    fn score(&self, messages: &[Message]) -> ScoreResult;
}

/// Passes on the first message whose content contains a marker string.
#[derive(Debug, Clone)]
pub struct MarkerScorer {
    marker: String,
}

impl MarkerScorer {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Scorer for MarkerScorer {
    fn score(&self, messages: &[Message]) -> ScoreResult {
        messages
            .iter()
            .find(|m| m.payload.content_text().contains(&self.marker))
            .map(|m| ScoreResult::passed_at(m.timestamp))
            .unwrap_or_else(ScoreResult::failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdebug_core::{MessageKind, Payload};

    #[test]
    fn test_marker_scorer_records_first_hit() {
        let say = |ts, text: &str| {
            Message::new(ts, MessageKind::Response, Some("tester".into()), None, Payload::text_message("tester", text))
        };
        let scorer = MarkerScorer::new("ALL TESTS PASSED");
        assert_eq!(scorer.score(&[say(1, "2 failing")]), ScoreResult::failed());
        assert_eq!(
            scorer.score(&[say(1, "2 failing"), say(4, "ALL TESTS PASSED"), say(6, "ALL TESTS PASSED")]),
            ScoreResult::passed_at(4)
        );
    }
}
