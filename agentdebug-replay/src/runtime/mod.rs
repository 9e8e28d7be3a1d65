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

//! In-process reference runtime.
//!
//! Holds the same bookkeeping a real agent runtime exposes to the debugger:
//! a FIFO queue of pending messages, the processed history of the current
//! session, archived sessions left behind by edits, and a processing loop.
//! Timestamps come from one monotonic counter and are assigned on enqueue,
//! so history is always ascending.
//!
//! Before each delivery the runtime checkpoints every participant's state
//! under the message timestamp. Editing a history message restores the
//! checkpoint taken just before that message was first delivered.

mod participant;
mod scoring;

pub use participant::{FnParticipant, Outgoing, Participant};
pub use scoring::{MarkerScorer, Scorer};

use crate::config::RuntimeConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::HistoryStore;
use agentdebug_core::{
    HistorySnapshot, Message, Payload, Session, SessionHistoryMap, SessionId, Timestamp,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RuntimeState {
    next_timestamp: Timestamp,
    session_id: SessionId,
    archived: SessionHistoryMap,
    history: Vec<Message>,
    fork: Option<Timestamp>,
    queue: VecDeque<Message>,
    /// Participant states before each delivery, in registration order
    checkpoints: BTreeMap<Timestamp, Vec<Option<Value>>>,
    processing: Option<CancellationToken>,
}

impl RuntimeState {
    /// Pick up where a saved run left off. The queue starts empty and no
    /// checkpoints are known for the restored history.
    fn resumed(snapshot: HistorySnapshot) -> Self {
        let HistorySnapshot {
            current_session,
            message_history,
        } = snapshot;
        let next_timestamp = message_history
            .messages()
            .map(|m| m.timestamp + 1)
            .max()
            .unwrap_or(0);

        let mut archived = SessionHistoryMap::new();
        let mut current = Session::default();
        for (id, session) in message_history.iter() {
            if id == current_session {
                current = session.clone();
            } else {
                archived.insert(id, session.clone());
            }
        }

        Self {
            next_timestamp,
            session_id: current_session,
            archived,
            history: current.messages,
            fork: current.fork_timestamp,
            ..Self::default()
        }
    }

    fn enqueue(&mut self, outgoing: Outgoing) -> Timestamp {
        let timestamp = self.next_timestamp;
        self.next_timestamp += 1;
        self.queue.push_back(Message::new(
            timestamp,
            outgoing.kind,
            outgoing.sender,
            outgoing.recipient,
            outgoing.payload,
        ));
        timestamp
    }

    fn is_processing(&self) -> bool {
        self.processing
            .as_ref()
            .map_or(false, |token| !token.is_cancelled())
    }

    fn stop_processing(&mut self) -> bool {
        match self.processing.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    state: Mutex<RuntimeState>,
    participants: Vec<Arc<dyn Participant>>,
    scorer: Option<Arc<dyn Scorer>>,
    config: RuntimeConfig,
}

impl Inner {
    /// Deliver the queue head. Returns its timestamp, or `None` when idle.
    fn process_next(&self) -> Option<Timestamp> {
        let mut state = self.state.lock();
        let message = state.queue.pop_front()?;
        let timestamp = message.timestamp;

        let checkpoint = self.participants.iter().map(|p| p.save_state()).collect();
        state.checkpoints.insert(timestamp, checkpoint);

        let replies: Vec<Outgoing> = self
            .participants
            .iter()
            .filter(|p| p.receives(&message))
            .flat_map(|p| p.on_message(&message))
            .collect();

        tracing::debug!(
            timestamp,
            kind = %message.kind,
            replies = replies.len(),
            "Processed message"
        );
        state.history.push(message);
        for reply in replies {
            state.enqueue(reply);
        }
        Some(timestamp)
    }

    /// Put every participant back into its state from before `timestamp`.
    fn restore(&self, state: &RuntimeState, timestamp: Timestamp) -> bool {
        let Some(checkpoint) = state.checkpoints.get(&timestamp) else {
            return false;
        };
        for (participant, saved) in self.participants.iter().zip(checkpoint) {
            if let Some(saved) = saved {
                participant.load_state(saved);
            }
        }
        true
    }

    fn score(&self, messages: &[Message]) -> Option<agentdebug_core::ScoreResult> {
        self.scorer.as_ref().map(|scorer| scorer.score(messages))
    }
}

/// Builder for [`LocalRuntime`].
pub struct LocalRuntimeBuilder {
    config: RuntimeConfig,
    participants: Vec<Arc<dyn Participant>>,
    scorer: Option<Arc<dyn Scorer>>,
    resume: Option<HistorySnapshot>,
}

impl LocalRuntimeBuilder {
    pub fn participant(mut self, participant: impl Participant + 'static) -> Self {
        self.participants.push(Arc::new(participant));
        self
    }

    /// Replace the scorer derived from the configured marker.
    pub fn scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Some(Arc::new(scorer));
        self
    }

    /// Start from a saved history instead of an empty one.
    ///
    /// Sessions other than `current_session` become archived sessions; the
    /// current one becomes the live history, keeping its fork point.
    /// Timestamps continue after the largest one in the snapshot.
    pub fn resume_from(mut self, snapshot: HistorySnapshot) -> Self {
        self.resume = Some(snapshot);
        self
    }

    pub fn build(self) -> LocalRuntime {
        let state = match self.resume {
            Some(snapshot) => RuntimeState::resumed(snapshot),
            None => RuntimeState::default(),
        };
        tracing::info!(
            participants = self.participants.len(),
            scored = self.scorer.is_some(),
            session_id = state.session_id,
            next_timestamp = state.next_timestamp,
            "Local runtime ready"
        );
        LocalRuntime {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                participants: self.participants,
                scorer: self.scorer,
                config: self.config,
            }),
        }
    }
}

/// Cheaply cloneable handle to an in-process runtime.
#[derive(Clone)]
pub struct LocalRuntime {
    inner: Arc<Inner>,
}

impl LocalRuntime {
    pub fn builder(config: RuntimeConfig) -> LocalRuntimeBuilder {
        let scorer = config
            .score_marker
            .clone()
            .map(|marker| Arc::new(MarkerScorer::new(marker)) as Arc<dyn Scorer>);
        LocalRuntimeBuilder {
            config,
            participants: Vec::new(),
            scorer,
            resume: None,
        }
    }

    /// Queue a message for every participant. `None` sender means the operator.
    pub fn publish(&self, sender: Option<&str>, payload: Payload) -> Timestamp {
        self.enqueue(Outgoing {
            kind: agentdebug_core::MessageKind::Publish,
            sender: sender.map(str::to_string),
            recipient: None,
            payload,
        })
    }

    /// Queue a direct message to `recipient`.
    pub fn send(&self, sender: Option<&str>, recipient: &str, payload: Payload) -> Timestamp {
        self.enqueue(Outgoing {
            kind: agentdebug_core::MessageKind::Send,
            sender: sender.map(str::to_string),
            recipient: Some(recipient.to_string()),
            payload,
        })
    }

    fn enqueue(&self, outgoing: Outgoing) -> Timestamp {
        let timestamp = self.inner.state.lock().enqueue(outgoing);
        tracing::debug!(timestamp, "Message queued");
        timestamp
    }

    pub fn current_session(&self) -> SessionId {
        self.inner.state.lock().session_id
    }

    fn snapshot(&self) -> HistorySnapshot {
        let state = self.inner.state.lock();
        let mut history = state.archived.clone();
        let live = Session {
            messages: state.history.clone(),
            fork_timestamp: state.fork,
            next_session_starts_at: None,
            score: self.inner.score(&state.history),
        };
        history.insert(state.session_id, live);
        HistorySnapshot::new(state.session_id, history)
    }

    fn spawn_loop(&self) -> bool {
        let token = {
            let mut state = self.inner.state.lock();
            if state.is_processing() {
                return false;
            }
            let token = CancellationToken::new();
            state.processing = Some(token.clone());
            token
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.loop_interval());
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        inner.process_next();
                    }
                }
            }
            tracing::debug!("Processing loop exited");
        });
        true
    }
}

#[async_trait]
impl HistoryStore for LocalRuntime {
    async fn fetch_session_history(&self) -> StoreResult<HistorySnapshot> {
        Ok(self.snapshot())
    }

    async fn fetch_queue(&self) -> StoreResult<Vec<Message>> {
        Ok(self.inner.state.lock().queue.iter().cloned().collect())
    }

    async fn edit_history_message(
        &self,
        timestamp: Timestamp,
        payload: Option<Payload>,
    ) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        let original = state
            .history
            .iter()
            .find(|m| m.timestamp == timestamp)
            .cloned()
            .ok_or(StoreError::UnknownTimestamp(timestamp))?;
        if !original.is_editable() {
            return Err(StoreError::NotResendable(original.kind));
        }

        state.stop_processing();

        let archived_id = state.session_id;
        let archived = Session {
            messages: state.history.clone(),
            fork_timestamp: state.fork,
            next_session_starts_at: Some(timestamp),
            score: self.inner.score(&state.history),
        };
        state.archived.insert(archived_id, archived);

        let restored = self.inner.restore(&state, timestamp);
        if !restored {
            tracing::warn!(timestamp, "No checkpoint for edited message, participant state kept");
        }

        state.session_id += 1;
        state.fork = Some(timestamp);
        state.history.retain(|m| m.timestamp < timestamp);
        state.checkpoints.retain(|&ts, _| ts < timestamp);
        state.queue.clear();
        let replayed = state.enqueue(Outgoing {
            kind: original.kind,
            sender: original.sender,
            recipient: original.recipient,
            payload: payload.unwrap_or(original.payload),
        });

        tracing::info!(
            session_id = state.session_id,
            fork = timestamp,
            replayed,
            restored,
            "Forked session from history edit"
        );
        Ok(())
    }

    async fn edit_queue_message(&self, index: usize, payload: Payload) -> StoreResult<()> {
        let mut state = self.inner.state.lock();
        let len = state.queue.len();
        let message = state
            .queue
            .get_mut(index)
            .ok_or(StoreError::QueueIndex { index, len })?;
        message.payload = payload;
        tracing::info!(index, timestamp = message.timestamp, "Edited queued message");
        Ok(())
    }

    async fn step(&self) -> StoreResult<()> {
        self.inner.process_next();
        Ok(())
    }

    async fn drop_next(&self) -> StoreResult<()> {
        if let Some(message) = self.inner.state.lock().queue.pop_front() {
            tracing::info!(timestamp = message.timestamp, "Dropped queued message");
        }
        Ok(())
    }

    async fn start_loop(&self) -> StoreResult<()> {
        if self.spawn_loop() {
            tracing::info!(
                interval_ms = self.inner.config.loop_interval_ms,
                "Processing loop started"
            );
        }
        Ok(())
    }

    async fn stop_loop(&self) -> StoreResult<()> {
        if self.inner.state.lock().stop_processing() {
            tracing::info!("Processing loop stopped");
        }
        Ok(())
    }

    async fn loop_running(&self) -> StoreResult<bool> {
        Ok(self.inner.state.lock().is_processing())
    }

    async fn pending_count(&self) -> StoreResult<usize> {
        Ok(self.inner.state.lock().queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdebug_core::{is_inherited, locate, MessageKind};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Numbers its replies, so replaying without a restore would shift them.
    #[derive(Default)]
    struct Counter {
        delivered: AtomicU64,
    }

    impl Participant for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn on_message(&self, _message: &Message) -> Vec<Outgoing> {
            let n = self.delivered.fetch_add(1, Ordering::SeqCst) + 1;
            vec![Outgoing::publish(
                "counter",
                Payload::text_message("counter", &format!("reply #{}", n)),
            )]
        }

        fn save_state(&self) -> Option<Value> {
            Some(Value::from(self.delivered.load(Ordering::SeqCst)))
        }

        fn load_state(&self, state: &Value) {
            if let Some(n) = state.as_u64() {
                self.delivered.store(n, Ordering::SeqCst);
            }
        }
    }

    fn counting_runtime() -> LocalRuntime {
        LocalRuntime::builder(RuntimeConfig::default())
            .participant(Counter::default())
            .build()
    }

    async fn replies(rt: &LocalRuntime) -> Vec<String> {
        rt.fetch_session_history()
            .await
            .unwrap()
            .current()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.sender.as_deref() == Some("counter"))
            .map(|m| m.payload.content_text())
            .collect()
    }

    /// Writer answers every delivery with a response; critic stays silent.
    fn runtime() -> LocalRuntime {
        LocalRuntime::builder(RuntimeConfig {
            loop_interval_ms: 5,
            ..RuntimeConfig::default()
        })
        .participant(FnParticipant::new("writer", |m: &Message| {
            vec![Outgoing::respond(
                "writer",
                m.sender.as_deref(),
                Payload::text_message("writer", &format!("re: {}", m.payload.content_text())),
            )]
        }))
        .participant(FnParticipant::new("critic", |_: &Message| Vec::new()))
        .build()
    }

    #[tokio::test]
    async fn test_step_records_and_replies() {
        let rt = runtime();
        let ts = rt.send(None, "writer", Payload::text_message("user", "outline"));
        assert_eq!(rt.pending_count().await.unwrap(), 1);

        rt.step().await.unwrap();
        let snapshot = rt.fetch_session_history().await.unwrap();
        let current = snapshot.current().unwrap();
        assert_eq!(current.messages[0].timestamp, ts);

        let queue = rt.fetch_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].kind, MessageKind::Response);
        assert_eq!(queue[0].payload.content_text(), "re: outline");
    }

    #[tokio::test]
    async fn test_step_on_empty_queue_is_noop() {
        let rt = runtime();
        rt.step().await.unwrap();
        let snapshot = rt.fetch_session_history().await.unwrap();
        assert!(snapshot.current().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_next_discards_without_recording() {
        let rt = runtime();
        rt.publish(None, Payload::text_message("user", "a"));
        rt.drop_next().await.unwrap();
        assert_eq!(rt.pending_count().await.unwrap(), 0);
        assert!(rt.fetch_session_history().await.unwrap().current().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_queue_out_of_range() {
        let rt = runtime();
        rt.publish(None, Payload::text_message("user", "a"));
        assert_eq!(
            rt.edit_queue_message(3, Payload::text_message("user", "b")).await,
            Err(StoreError::QueueIndex { index: 3, len: 1 })
        );
        rt.edit_queue_message(0, Payload::text_message("user", "b")).await.unwrap();
        assert_eq!(rt.fetch_queue().await.unwrap()[0].payload.content_text(), "b");
    }

    #[tokio::test]
    async fn test_history_edit_forks_session() {
        let rt = runtime();
        let first = rt.send(None, "writer", Payload::text_message("user", "one"));
        rt.step().await.unwrap(); // user -> writer
        rt.step().await.unwrap(); // writer response
        let second = rt.send(None, "writer", Payload::text_message("user", "two"));
        rt.step().await.unwrap();

        rt.edit_history_message(second, Some(Payload::text_message("user", "TWO")))
            .await
            .unwrap();

        let snapshot = rt.fetch_session_history().await.unwrap();
        snapshot.validate().unwrap();
        assert_eq!(snapshot.current_session, 1);

        let archived = snapshot.message_history.get(0).unwrap();
        assert_eq!(archived.len(), 3);
        assert_eq!(archived.next_session_starts_at, Some(second));

        let current = snapshot.current().unwrap();
        assert_eq!(current.fork_timestamp, Some(second));
        assert_eq!(current.len(), 2);
        assert!(current.messages.iter().all(|m| is_inherited(current, m)));
        assert_eq!(current.messages[0].timestamp, first);

        let queue = rt.fetch_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert!(queue[0].timestamp > second);
        assert_eq!(queue[0].payload.content_text(), "TWO");
        assert_eq!(queue[0].recipient.as_deref(), Some("writer"));

        rt.step().await.unwrap();
        let snapshot = rt.fetch_session_history().await.unwrap();
        assert_eq!(locate(snapshot.current().unwrap()), Some(2));
    }

    #[tokio::test]
    async fn test_revert_without_payload_replays_original() {
        let rt = runtime();
        let ts = rt.send(None, "writer", Payload::text_message("user", "same"));
        rt.step().await.unwrap();
        rt.edit_history_message(ts, None).await.unwrap();

        let queue = rt.fetch_queue().await.unwrap();
        assert_eq!(queue[0].payload.content_text(), "same");
        assert!(rt.fetch_session_history().await.unwrap().current().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_history_edit_has_no_side_effects() {
        let rt = runtime();
        rt.send(None, "writer", Payload::text_message("user", "x"));
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        let response_ts = rt.fetch_session_history().await.unwrap().current().unwrap().messages[1].timestamp;
        let before = rt.fetch_session_history().await.unwrap();

        assert_eq!(
            rt.edit_history_message(response_ts, None).await,
            Err(StoreError::NotResendable(MessageKind::Response))
        );
        assert_eq!(
            rt.edit_history_message(999, None).await,
            Err(StoreError::UnknownTimestamp(999))
        );
        assert_eq!(rt.fetch_session_history().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_loop_processes_until_stopped() {
        let rt = runtime();
        rt.publish(None, Payload::text_message("user", "go"));
        rt.start_loop().await.unwrap();
        assert!(rt.loop_running().await.unwrap());

        tokio::time::timeout(Duration::from_secs(2), async {
            while rt.fetch_session_history().await.unwrap().current().unwrap().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        rt.stop_loop().await.unwrap();
        assert!(!rt.loop_running().await.unwrap());
    }

    #[tokio::test]
    async fn test_marker_scorer_applies_to_live_session() {
        let rt = LocalRuntime::builder(RuntimeConfig::default()).build();
        rt.publish(Some("tester"), Payload::text_message("tester", "ALL TESTS PASSED !#!#"));
        rt.step().await.unwrap();
        let snapshot = rt.fetch_session_history().await.unwrap();
        let score = snapshot.current().unwrap().score.clone().unwrap();
        assert!(score.passed);
        assert_eq!(score.first_timestamp, Some(0));
    }

    #[tokio::test]
    async fn test_revert_restores_participant_state() {
        let rt = counting_runtime();
        let question = rt.send(None, "counter", Payload::text_message("user", "q"));
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        assert_eq!(replies(&rt).await, vec!["reply #1"]);

        rt.edit_history_message(question, None).await.unwrap();
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        assert_eq!(replies(&rt).await, vec!["reply #1"]);
    }

    #[tokio::test]
    async fn test_revert_to_later_message_keeps_earlier_progress() {
        let rt = counting_runtime();
        rt.send(None, "counter", Payload::text_message("user", "a"));
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        let second = rt.send(None, "counter", Payload::text_message("user", "b"));
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        assert_eq!(replies(&rt).await, vec!["reply #1", "reply #2"]);

        rt.edit_history_message(second, Some(Payload::text_message("user", "B")))
            .await
            .unwrap();
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        assert_eq!(replies(&rt).await, vec!["reply #1", "reply #2"]);

        let kept: Vec<Timestamp> = rt.inner.state.lock().checkpoints.keys().copied().collect();
        assert_eq!(kept, vec![0, 1, 4, 5]);
    }

    #[tokio::test]
    async fn test_resume_from_snapshot() {
        let rt = runtime();
        let first = rt.send(None, "writer", Payload::text_message("user", "one"));
        rt.step().await.unwrap();
        rt.step().await.unwrap();
        rt.edit_history_message(first, Some(Payload::text_message("user", "uno")))
            .await
            .unwrap();
        rt.step().await.unwrap();
        let saved = rt.fetch_session_history().await.unwrap();
        let json = serde_json::to_string(&saved).unwrap();

        let restored: HistorySnapshot = serde_json::from_str(&json).unwrap();
        let resumed = LocalRuntime::builder(RuntimeConfig::default())
            .resume_from(restored)
            .build();

        assert_eq!(resumed.current_session(), 1);
        assert_eq!(resumed.fetch_session_history().await.unwrap(), saved);
        assert_eq!(resumed.pending_count().await.unwrap(), 0);

        let last = saved.message_history.messages().map(|m| m.timestamp).max().unwrap();
        let next = resumed.publish(None, Payload::text_message("user", "more"));
        assert!(next > last);

        resumed.step().await.unwrap();
        let current_ts = saved.current().unwrap().messages[0].timestamp;
        resumed.edit_history_message(current_ts, None).await.unwrap();
        let snapshot = resumed.fetch_session_history().await.unwrap();
        snapshot.validate().unwrap();
        assert_eq!(snapshot.current_session, 2);
        assert_eq!(snapshot.message_history.get(1).unwrap().next_session_starts_at, Some(current_ts));
    }
}
