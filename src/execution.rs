// Copyright 2025 Cowboy AI, LLC.

//! Execution lifecycle
//!
//! Every run of a combination walks one path through
//!
//! ```text
//! PENDING -> READING -> VALIDATING -> TRANSFORMING -> WRITING -> SUCCEEDED
//!               |            |              |             |
//!               +------------+--------------+-------------+--> FAILED
//! ```
//!
//! `SUCCEEDED` and `FAILED` are terminal. There are no retries and no
//! backward transitions; [`ExecutionTrace::advance`] rejects anything else.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::errors::StructuredError;

/// Stage of a single execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ExecutionState {
    /// Created, nothing has run yet
    Pending = 0,
    /// Awaiting the read operation
    Reading = 1,
    /// Evaluating payload laws against the read output
    Validating = 2,
    /// Applying the transform and the pre-write guards
    Transforming = 3,
    /// Awaiting the write operation
    Writing = 4,
    /// Both operations succeeded
    Succeeded = 5,
    /// A stage failed
    Failed = 6,
}

impl ExecutionState {
    /// Name of the state
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Reading => "READING",
            Self::Validating => "VALIDATING",
            Self::Transforming => "TRANSFORMING",
            Self::Writing => "WRITING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// States reachable in one step
    pub fn valid_transitions(&self) -> Vec<Self> {
        use ExecutionState::*;

        match self {
            Pending => vec![Reading],
            Reading => vec![Validating, Failed],
            Validating => vec![Transforming, Failed],
            Transforming => vec![Writing, Failed],
            Writing => vec![Succeeded, Failed],
            Succeeded | Failed => vec![],
        }
    }

    /// Check if a transition is valid
    pub fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Reading,
            2 => Self::Validating,
            3 => Self::Transforming,
            4 => Self::Writing,
            5 => Self::Succeeded,
            6 => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid execution transition from {from} to {to}")]
pub struct InvalidTransition {
    /// State before the attempted transition
    pub from: ExecutionState,
    /// Requested state
    pub to: ExecutionState,
}

impl From<InvalidTransition> for StructuredError {
    fn from(err: InvalidTransition) -> Self {
        StructuredError::system("INVALID_TRANSITION", err.to_string())
            .with_detail("stage", err.from.name())
    }
}

/// One entered state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// State entered
    pub state: ExecutionState,
    /// When it was entered
    pub entered_at: DateTime<Utc>,
}

/// Shared view of the stage an execution is in
///
/// Survives the execution future being dropped, which is how a cancelled run
/// learns which stage it interrupted.
#[derive(Debug, Clone, Default)]
pub struct StageProbe(Arc<AtomicU8>);

impl StageProbe {
    /// Probe starting at [`ExecutionState::Pending`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state recorded
    pub fn current(&self) -> ExecutionState {
        ExecutionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ExecutionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// States one execution passed through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Correlation id shared with the execution's tracing span
    pub run_id: Uuid,
    stages: Vec<StageRecord>,
    #[serde(skip)]
    probe: Option<StageProbe>,
}

impl ExecutionTrace {
    /// Trace in [`ExecutionState::Pending`]
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: vec![StageRecord {
                state: ExecutionState::Pending,
                entered_at: Utc::now(),
            }],
            probe: None,
        }
    }

    /// Mirror every transition into `probe`
    pub fn with_probe(mut self, probe: StageProbe) -> Self {
        probe.set(self.current());
        self.probe = Some(probe);
        self
    }

    /// Current state
    pub fn current(&self) -> ExecutionState {
        self.stages
            .last()
            .map(|record| record.state)
            .unwrap_or(ExecutionState::Pending)
    }

    /// Transition to the next state
    pub fn advance(&mut self, to: ExecutionState) -> Result<(), InvalidTransition> {
        let from = self.current();
        if !from.can_transition_to(&to) {
            return Err(InvalidTransition { from, to });
        }

        debug!(run_id = %self.run_id, from = from.name(), to = to.name(), "stage transition");
        self.stages.push(StageRecord {
            state: to,
            entered_at: Utc::now(),
        });
        if let Some(probe) = &self.probe {
            probe.set(to);
        }
        Ok(())
    }

    /// Move to [`ExecutionState::Failed`], returning the stage that failed
    ///
    /// A trace that already ended is left untouched.
    pub fn fail(&mut self) -> ExecutionState {
        let stage = self.current();
        if !stage.is_terminal() {
            let _ = self.advance(ExecutionState::Failed);
        }
        stage
    }

    /// Every state entered, in order
    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    /// Just the states, in order
    pub fn states(&self) -> Vec<ExecutionState> {
        self.stages.iter().map(|record| record.state).collect()
    }

    /// Time from creation to the last transition
    pub fn elapsed(&self) -> chrono::Duration {
        match (self.stages.first(), self.stages.last()) {
            (Some(first), Some(last)) => last.entered_at - first.entered_at,
            _ => chrono::Duration::zero(),
        }
    }
}
