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

//! Polling and reference runtime configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`PollConfig::interval_ms`].
pub const POLL_INTERVAL_ENV: &str = "AGENTDEBUG_POLL_INTERVAL_MS";

/// Pass marker looked for by the default scorer.
pub const DEFAULT_SCORE_MARKER: &str = "ALL TESTS PASSED !#!#";

/// Snapshot polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Milliseconds between full snapshot fetches
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollConfig {
    /// Defaults, with the interval taken from the environment when set.
    ///
    /// Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_override()
    }

    /// Replace the interval with the environment value when one is set.
    pub fn with_env_override(mut self) -> Self {
        if let Some(ms) = std::env::var(POLL_INTERVAL_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            self.interval_ms = ms;
        }
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Reference runtime knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Pause between messages while the processing loop runs
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,

    /// Content marker that makes a session pass; `None` disables scoring
    #[serde(default = "default_score_marker")]
    pub score_marker: Option<String>,
}

fn default_loop_interval_ms() -> u64 {
    100
}

fn default_score_marker() -> Option<String> {
    Some(DEFAULT_SCORE_MARKER.to_string())
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: default_loop_interval_ms(),
            score_marker: default_score_marker(),
        }
    }
}

impl RuntimeConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms.max(1))
    }
}
