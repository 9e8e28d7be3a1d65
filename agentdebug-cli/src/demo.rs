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

//! Scripted replay against the local runtime.
//!
//! A writer drafts whatever the operator asks for and hands it to a critic,
//! who only accepts haiku and numbers every review. The first run fails; the
//! operator then edits the original request and the forked session passes.
//! A saved run can be resumed and forked again.

use agentdebug_core::{HistorySnapshot, Message, MessageKind, Payload, Timestamp};
use agentdebug_replay::{
    ActionGate, EditSlot, FnParticipant, LocalRuntime, Outgoing, Participant, PollConfig,
    RefreshClock, ReplayController, RuntimeConfig, SharedStore, SnapshotSync,
    DEFAULT_SCORE_MARKER,
};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DemoOptions {
    pub first_request: String,
    pub revised_request: String,
    pub steps: usize,
}

/// What to do with a resumed run.
pub struct ResumeOptions {
    /// History message of the current session to edit and replay from
    pub revert: Option<Timestamp>,
    /// Replacement request text; the original is replayed when absent
    pub revised_request: Option<String>,
    /// New request published after resuming
    pub request: Option<String>,
    pub steps: usize,
}

struct Critic {
    marker: String,
    reviews: AtomicU64,
}

impl Participant for Critic {
    fn name(&self) -> &str {
        "critic"
    }

    fn on_message(&self, message: &Message) -> Vec<Outgoing> {
        if message.kind != MessageKind::Send {
            return Vec::new();
        }
        let n = self.reviews.fetch_add(1, Ordering::SeqCst) + 1;
        let verdict = if message.payload.content_text().contains("haiku") {
            format!("review {}: five seven five. {}", n, self.marker)
        } else {
            format!("review {}: not a haiku, rejected", n)
        };
        vec![Outgoing::respond(
            "critic",
            message.sender.as_deref(),
            Payload::text_message("critic", &verdict),
        )]
    }

    fn save_state(&self) -> Option<Value> {
        Some(Value::from(self.reviews.load(Ordering::SeqCst)))
    }

    fn load_state(&self, state: &Value) {
        if let Some(n) = state.as_u64() {
            self.reviews.store(n, Ordering::SeqCst);
        }
    }
}

fn writers_room(config: &RuntimeConfig, resume: Option<HistorySnapshot>) -> LocalRuntime {
    let marker = config
        .score_marker
        .clone()
        .unwrap_or_else(|| DEFAULT_SCORE_MARKER.to_string());

    let builder = LocalRuntime::builder(config.clone())
        .participant(FnParticipant::new("writer", |m: &Message| {
            if m.kind != MessageKind::Publish {
                return Vec::new();
            }
            let request = m.payload.content_text();
            vec![
                Outgoing::thought("writer", format!("planning: {}", request)),
                Outgoing::send(
                    "writer",
                    "critic",
                    Payload::text_message("writer", &format!("draft for '{}'", request)),
                ),
            ]
        }))
        .participant(Critic {
            marker,
            reviews: AtomicU64::new(0),
        });
    match resume {
        Some(snapshot) => builder.resume_from(snapshot).build(),
        None => builder.build(),
    }
}

/// Poller and controller wired to one runtime.
struct Harness {
    runtime: LocalRuntime,
    sync: Arc<SnapshotSync>,
    controller: ReplayController,
    cancel: CancellationToken,
    poller: JoinHandle<()>,
}

impl Harness {
    fn attach(runtime: LocalRuntime, poll: PollConfig) -> Self {
        let store: SharedStore = Arc::new(runtime.clone());
        let sync = Arc::new(SnapshotSync::new(
            Arc::clone(&store),
            Arc::new(RefreshClock::new()),
            poll,
        ));
        let cancel = CancellationToken::new();
        let poller = Arc::clone(&sync).spawn(cancel.clone());
        let controller = ReplayController::new(store, Arc::clone(&sync), ActionGate::new());
        Self {
            runtime,
            sync,
            controller,
            cancel,
            poller,
        }
    }

    async fn steps(&self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.controller.step().await?;
        }
        Ok(())
    }

    /// Edit the current-session message at `timestamp` and replay from it.
    async fn replay_from(&self, timestamp: Timestamp, request: Option<&str>) -> Result<()> {
        let original = self
            .sync
            .history()
            .current()
            .and_then(|session| session.message_at(timestamp).cloned())
            .ok_or_else(|| anyhow!("no message at t={} in the current session", timestamp))?;

        let mut slot = EditSlot::for_history(original);
        match request {
            Some(request) => {
                let draft = serde_json::json!({
                    "type": "TextMessage",
                    "source": "user",
                    "content": request,
                });
                slot.set_draft(serde_json::to_string_pretty(&draft)?)?;
                self.controller
                    .save(&mut slot)
                    .await
                    .context("Edit and revert failed")?;
            }
            None => self
                .controller
                .revert(&mut slot)
                .await
                .context("Revert failed")?,
        }
        info!(
            session_id = self.sync.history().current_session,
            fork = timestamp,
            "Replaying from edited message"
        );
        Ok(())
    }

    async fn finish(self) -> Result<HistorySnapshot> {
        self.cancel.cancel();
        self.poller.await.context("Poller task panicked")?;
        Ok(self.sync.history().as_ref().clone())
    }
}

/// Run the script and return the final history.
pub async fn run(
    options: DemoOptions,
    runtime_config: &RuntimeConfig,
    poll: PollConfig,
) -> Result<HistorySnapshot> {
    let harness = Harness::attach(writers_room(runtime_config, None), poll);

    let request = harness
        .runtime
        .publish(None, Payload::text_message("user", &options.first_request));
    info!(timestamp = request, "Published first request");
    harness.steps(options.steps).await?;

    harness
        .replay_from(request, Some(options.revised_request.as_str()))
        .await?;
    harness.steps(options.steps).await?;

    harness.finish().await
}

/// Continue a saved run and return the resulting history.
pub async fn resume(
    snapshot: HistorySnapshot,
    options: ResumeOptions,
    runtime_config: &RuntimeConfig,
    poll: PollConfig,
) -> Result<HistorySnapshot> {
    snapshot.validate().context("Cannot resume from an invalid snapshot")?;
    info!(
        session_id = snapshot.current_session,
        sessions = snapshot.message_history.len(),
        "Resuming saved run"
    );
    let harness = Harness::attach(writers_room(runtime_config, Some(snapshot)), poll);
    harness.sync.refresh().await;

    if let Some(timestamp) = options.revert {
        harness
            .replay_from(timestamp, options.revised_request.as_deref())
            .await?;
    }
    if let Some(request) = &options.request {
        let timestamp = harness
            .runtime
            .publish(None, Payload::text_message("user", request));
        info!(timestamp, "Published request");
    }
    harness.steps(options.steps).await?;

    harness.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_snapshot;
    use agentdebug_core::{locate, ScoreResult, Session};

    fn demo_options() -> DemoOptions {
        DemoOptions {
            first_request: "write a limerick".into(),
            revised_request: "write a haiku".into(),
            steps: 4,
        }
    }

    fn reviews(session: &Session) -> Vec<String> {
        session
            .messages
            .iter()
            .filter(|m| m.sender.as_deref() == Some("critic"))
            .map(|m| m.payload.content_text())
            .collect()
    }

    #[tokio::test]
    async fn test_demo_forks_into_passing_session() {
        let snapshot = run(
            demo_options(),
            &RuntimeConfig::default(),
            PollConfig { interval_ms: 50 },
        )
        .await
        .unwrap();

        snapshot.validate().unwrap();
        assert_eq!(snapshot.current_session, 1);

        let first = snapshot.message_history.get(0).unwrap();
        assert_eq!(first.score, Some(ScoreResult::failed()));
        assert_eq!(first.len(), 4);

        let second = snapshot.current().unwrap();
        assert!(second.score.as_ref().unwrap().passed);
        assert_eq!(second.fork_timestamp, Some(0));
        assert_eq!(locate(second), Some(0));

        // The critic was rewound along with the history
        assert!(reviews(first)[0].starts_with("review 1:"));
        assert!(reviews(second)[0].starts_with("review 1:"));
    }

    #[tokio::test]
    async fn test_resume_saved_run_and_fork_again() {
        let poll = PollConfig { interval_ms: 50 };
        let saved = run(demo_options(), &RuntimeConfig::default(), poll.clone())
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, serde_json::to_string_pretty(&saved).unwrap()).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, saved);

        let replayed_request = saved.current().unwrap().messages[0].timestamp;
        let resumed = resume(
            loaded,
            ResumeOptions {
                revert: Some(replayed_request),
                revised_request: Some("write a sonnet".into()),
                request: None,
                steps: 4,
            },
            &RuntimeConfig::default(),
            poll,
        )
        .await
        .unwrap();

        resumed.validate().unwrap();
        assert_eq!(resumed.current_session, 2);
        assert_eq!(resumed.message_history.get(0), saved.message_history.get(0));

        let passed = resumed.message_history.get(1).unwrap();
        assert!(passed.score.as_ref().unwrap().passed);
        assert_eq!(passed.next_session_starts_at, Some(replayed_request));

        let current = resumed.current().unwrap();
        assert_eq!(current.fork_timestamp, Some(replayed_request));
        assert_eq!(current.score, Some(ScoreResult::failed()));
        assert!(current
            .messages
            .iter()
            .all(|m| m.timestamp > saved.message_history.messages().map(|m| m.timestamp).max().unwrap()));
    }

    #[tokio::test]
    async fn test_resume_rejects_invalid_snapshot() {
        let mut saved = run(
            demo_options(),
            &RuntimeConfig::default(),
            PollConfig { interval_ms: 50 },
        )
        .await
        .unwrap();
        saved.current_session = 7;

        let err = resume(
            saved,
            ResumeOptions {
                revert: None,
                revised_request: None,
                request: None,
                steps: 0,
            },
            &RuntimeConfig::default(),
            PollConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("invalid snapshot"));
    }
}
