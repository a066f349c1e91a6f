// ABOUTME: Canonical lifecycle states, their legal transitions, and the decision table.
// ABOUTME: `plan` is pure: given a goal and an observed state it names the next step.

use serde::Serialize;
use std::fmt;

/// Provider-independent power/life state of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalState {
    /// No provider instance carries the machine's name.
    Absent,
    Pending,
    Running,
    Stopping,
    Stopped,
    /// Absorbing: a terminated instance never comes back.
    Terminated,
}

impl CanonicalState {
    pub const ALL: [CanonicalState; 6] = [
        CanonicalState::Absent,
        CanonicalState::Pending,
        CanonicalState::Running,
        CanonicalState::Stopping,
        CanonicalState::Stopped,
        CanonicalState::Terminated,
    ];

    /// Normalize a provider status string.
    ///
    /// Covers both EC2-style and Hetzner-style vocabularies. Returns `None` for
    /// anything not in the table.
    pub fn from_provider(status: &str) -> Option<Self> {
        let state = match status {
            "pending" | "initializing" | "starting" | "migrating" | "rebuilding" => {
                CanonicalState::Pending
            }
            "running" => CanonicalState::Running,
            "stopping" => CanonicalState::Stopping,
            "stopped" | "off" => CanonicalState::Stopped,
            "shutting-down" | "terminated" | "deleting" => CanonicalState::Terminated,
            _ => return None,
        };
        Some(state)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalState::Absent => "absent",
            CanonicalState::Pending => "pending",
            CanonicalState::Running => "running",
            CanonicalState::Stopping => "stopping",
            CanonicalState::Stopped => "stopped",
            CanonicalState::Terminated => "terminated",
        }
    }

    /// Owned by the provider; cannot be requested, only waited out.
    pub fn is_transient(&self) -> bool {
        matches!(self, CanonicalState::Pending | CanonicalState::Stopping)
    }

    /// No live instance exists for the machine.
    pub fn is_gone(&self) -> bool {
        matches!(self, CanonicalState::Absent | CanonicalState::Terminated)
    }

    /// Whether the provider may move an instance from `self` to `next`.
    pub fn can_transition_to(&self, next: CanonicalState) -> bool {
        use CanonicalState::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Absent, Pending) => true,
            (Pending, Running) => true,
            (Running, Stopping) => true,
            (Stopping, Stopped) => true,
            (Stopped, Pending) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CanonicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state an operation drives a machine toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    Running,
    Stopped,
    Destroyed,
}

impl Goal {
    pub fn is_satisfied_by(&self, state: CanonicalState) -> bool {
        match self {
            Goal::Running => state == CanonicalState::Running,
            Goal::Stopped => matches!(
                state,
                CanonicalState::Stopped | CanonicalState::Absent | CanonicalState::Terminated
            ),
            Goal::Destroyed => state.is_gone(),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Goal::Running => "running",
            Goal::Stopped => "stopped",
            Goal::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// A provider call that changes a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutation {
    /// Create a new instance; creation implies start.
    Create,
    Start,
    Stop,
    Terminate,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mutation::Create => "create",
            Mutation::Start => "start",
            Mutation::Stop => "stop",
            Mutation::Terminate => "terminate",
        };
        f.write_str(s)
    }
}

/// What the reconciler does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Goal already satisfied.
    Done,
    /// A transient state must settle before deciding.
    Wait,
    Issue(Mutation),
}

/// The reconciliation decision table.
pub fn plan(goal: Goal, state: CanonicalState) -> Step {
    use CanonicalState::*;
    match (goal, state) {
        (Goal::Running, Running) => Step::Done,
        (Goal::Running, Absent | Terminated) => Step::Issue(Mutation::Create),
        (Goal::Running, Stopped) => Step::Issue(Mutation::Start),
        (Goal::Running, Pending | Stopping) => Step::Wait,

        (Goal::Stopped, Running) => Step::Issue(Mutation::Stop),
        (Goal::Stopped, Pending | Stopping) => Step::Wait,
        (Goal::Stopped, Stopped | Absent | Terminated) => Step::Done,

        (Goal::Destroyed, Absent | Terminated) => Step::Done,
        (Goal::Destroyed, Pending | Running | Stopping | Stopped) => {
            Step::Issue(Mutation::Terminate)
        }
    }
}
