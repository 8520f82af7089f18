//! Execution lifecycle types.
//!
//! An execution is either running or done. Only the transition into a done
//! state is reported to the stats layer, and it happens at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique execution identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Create a new random execution ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ExecutionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Execution state machine: `Running -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    Running,
    Done {
        finished_at: DateTime<Utc>,
        success: bool,
    },
}

impl ExecutionState {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Done { success: true, .. } => write!(f, "succeeded"),
            Self::Done { success: false, .. } => write!(f, "failed"),
        }
    }
}

/// A single job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    /// Name of the job this execution belongs to (metrics label).
    pub job_name: String,
    /// Node that ran the execution, if known.
    #[serde(default)]
    pub node_name: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: ExecutionState,
}

impl Execution {
    /// Create a running execution.
    pub fn start(job_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: ExecutionId::new(),
            job_name: job_name.into(),
            node_name: None,
            started_at,
            state: ExecutionState::Running,
        }
    }

    /// Builder-style node assignment.
    #[must_use]
    pub fn on_node(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Move into the done state.
    ///
    /// Returns `false` (and leaves the state untouched) if the execution was
    /// already done.
    pub fn complete(&mut self, finished_at: DateTime<Utc>, success: bool) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ExecutionState::Done {
            finished_at,
            success,
        };
        true
    }

    /// `(finished_at, success)` for a done execution, `None` while running.
    pub fn outcome(&self) -> Option<(DateTime<Utc>, bool)> {
        match self.state {
            ExecutionState::Running => None,
            ExecutionState::Done {
                finished_at,
                success,
            } => Some((finished_at, success)),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }
}
