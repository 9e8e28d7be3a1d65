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

//! CLI configuration file.

use agentdebug_core::{HistorySnapshot, TimelineConfig};
use agentdebug_replay::{PollConfig, RuntimeConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `agentdebug.toml`. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl CliConfig {
    /// Load from `path`, or defaults when no file is given. The poll
    /// interval environment variable wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str::<CliConfig>(&raw)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => CliConfig::default(),
        };
        config.poll = config.poll.with_env_override();
        tracing::debug!(?path, poll_interval_ms = config.poll.interval_ms, "Configuration loaded");
        Ok(config)
    }
}

/// Read a history snapshot file as served by the runtime.
pub fn load_snapshot(path: &Path) -> Result<HistorySnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
[timeline.layout]
column_gap = 30.0

[timeline.palette]
missing = "#111111"

[runtime]
loop_interval_ms = 20
score_marker = "DONE"
"##
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.timeline.layout.column_gap, 30.0);
        assert_eq!(config.timeline.layout.node_width, 20.0);
        assert_eq!(config.timeline.palette.missing.as_str(), "#111111");
        assert_eq!(config.runtime.loop_interval_ms, 20);
        assert_eq!(config.runtime.score_marker.as_deref(), Some("DONE"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[timeline.layout]\nnode_width = \"wide\"").unwrap();
        let err = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_load_snapshot() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"current_session": 0, "message_history": {{"0": {{"messages": [
                {{"type": "SendMessageEnvelope", "message": {{"type": "TextMessage", "source": "user", "content": "hi"}},
                  "sender": null, "recipient": "writer", "timestamp": 0}}
            ]}}}}}}"#
        )
        .unwrap();

        let snapshot = load_snapshot(file.path()).unwrap();
        assert_eq!(snapshot.current().unwrap().len(), 1);
    }
}
