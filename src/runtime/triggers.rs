//! Trigger predicates: decide from upstream states whether a task may run.
//!
//! A trigger never looks at the task it belongs to, only at the states its
//! upstream dependencies reached. Tasks without upstream dependencies are
//! eligible under every trigger except [`Trigger::ManualOnly`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TaskflowError;

/// Run-time state of a task as reported by an execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Retrying,
    Success,
    /// Skipped tasks count as successful for their dependents.
    Skipped,
    Failed,
}

impl TaskState {
    pub fn is_successful(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Skipped)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, TaskState::Failed)
    }

    pub fn is_finished(self) -> bool {
        self.is_successful() || self.is_failed()
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Pending
    }
}

/// Readiness predicate attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Every upstream task succeeded.
    AllSuccess,
    /// Every upstream task failed.
    AllFailed,
    /// Every upstream task finished, whatever the outcome.
    #[serde(alias = "always_run")]
    AllFinished,
    /// At least one upstream task succeeded.
    AnySuccess,
    /// At least one upstream task failed.
    AnyFailed,
    /// Never eligible automatically; an operator has to start the task.
    ManualOnly,
}

impl Default for Trigger {
    fn default() -> Self {
        Trigger::AllSuccess
    }
}

impl Trigger {
    pub const ALL: [Trigger; 6] = [
        Trigger::AllSuccess,
        Trigger::AllFailed,
        Trigger::AllFinished,
        Trigger::AnySuccess,
        Trigger::AnyFailed,
        Trigger::ManualOnly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trigger::AllSuccess => "all_success",
            Trigger::AllFailed => "all_failed",
            Trigger::AllFinished => "all_finished",
            Trigger::AnySuccess => "any_success",
            Trigger::AnyFailed => "any_failed",
            Trigger::ManualOnly => "manual_only",
        }
    }

    /// Evaluate the predicate over the states of the upstream tasks.
    pub fn evaluate(self, upstream: &[TaskState]) -> bool {
        if let Trigger::ManualOnly = self {
            return false;
        }
        if upstream.is_empty() {
            return true;
        }

        match self {
            Trigger::AllSuccess => upstream.iter().all(|s| s.is_successful()),
            Trigger::AllFailed => upstream.iter().all(|s| s.is_failed()),
            Trigger::AllFinished => upstream.iter().all(|s| s.is_finished()),
            Trigger::AnySuccess => upstream.iter().any(|s| s.is_successful()),
            Trigger::AnyFailed => upstream.iter().any(|s| s.is_failed()),
            Trigger::ManualOnly => false,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trigger {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all_success" => Ok(Trigger::AllSuccess),
            "all_failed" => Ok(Trigger::AllFailed),
            "all_finished" | "always_run" => Ok(Trigger::AllFinished),
            "any_success" => Ok(Trigger::AnySuccess),
            "any_failed" => Ok(Trigger::AnyFailed),
            "manual_only" => Ok(Trigger::ManualOnly),
            other => Err(TaskflowError::Config(format!(
                "unknown trigger '{other}' (expected one of all_success, all_failed, \
                 all_finished, any_success, any_failed, manual_only)"
            ))),
        }
    }
}
