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

//! Agentdebug Replay
//!
//! The live side of the debugger: snapshot polling against a
//! [`HistoryStore`], the edit-and-revert controller with its action gate,
//! and [`LocalRuntime`], an in-process store for demos and tests.

pub mod clock;
pub mod config;
pub mod controller;
pub mod edit;
pub mod error;
pub mod gate;
pub mod poller;
pub mod runtime;
pub mod store;

pub use clock::RefreshClock;
pub use config::{PollConfig, RuntimeConfig, DEFAULT_SCORE_MARKER, POLL_INTERVAL_ENV};
pub use controller::ReplayController;
pub use edit::{EditSlot, EditTarget, SlotState};
pub use error::{EditError, ReplayError, Result, StoreError, StoreResult};
pub use gate::{ActionGate, GateGuard};
pub use poller::{RefreshReport, RunStatus, SnapshotSync};
pub use runtime::{
    FnParticipant, LocalRuntime, LocalRuntimeBuilder, MarkerScorer, Outgoing, Participant, Scorer,
};
pub use store::{HistoryStore, SharedStore};
