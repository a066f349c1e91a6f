// ABOUTME: Reconciliation error types with the SNAFU pattern.
// ABOUTME: `kind()` gives the command boundary a stable classification of each failure.

use snafu::Snafu;
use std::time::Duration;

use super::state::{CanonicalState, Goal};
use crate::provider::{Exhausted, ProviderError};
use crate::types::{InstanceId, MachineName};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReconcileError {
    #[snafu(display(
        "machine '{name}' matches {} live provider instances ({}); names must be unique",
        ids.len(),
        join_ids(ids)
    ))]
    AmbiguousMachine {
        name: MachineName,
        ids: Vec<InstanceId>,
    },

    #[snafu(display(
        "timed out after {}s waiting for machine '{name}' to become {goal} (last observed: {last_state}); the provider may still complete the action",
        waited.as_secs()
    ))]
    Timeout {
        name: MachineName,
        goal: Goal,
        last_state: CanonicalState,
        waited: Duration,
    },

    #[snafu(display("instance {id} of machine '{name}' disappeared while it was being changed"))]
    NotFound { name: MachineName, id: InstanceId },

    #[snafu(display("provider unavailable after {attempts} attempt(s): {source}"))]
    ProviderUnavailable {
        attempts: u32,
        source: ProviderError,
    },

    #[snafu(display("provider error: {source}"))]
    Provider { source: ProviderError },

    #[snafu(display("machine '{name}' reports unrecognized provider state '{status}'"))]
    UnknownState { name: MachineName, status: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileErrorKind {
    /// An instance vanished under a provider call, twice in one operation.
    NotFound,
    /// More than one live instance carries the machine's name.
    AmbiguousMachine,
    /// The machine did not converge before the deadline.
    Timeout,
    /// Transport or authentication failures outlasted the retry budget.
    ProviderUnavailable,
    /// The provider rejected a call or answered with something unusable.
    ProviderRejected,
    /// A status string outside the normalization table.
    UnknownState,
}

impl ReconcileError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ReconcileErrorKind {
        match self {
            ReconcileError::AmbiguousMachine { .. } => ReconcileErrorKind::AmbiguousMachine,
            ReconcileError::Timeout { .. } => ReconcileErrorKind::Timeout,
            ReconcileError::NotFound { .. } => ReconcileErrorKind::NotFound,
            ReconcileError::ProviderUnavailable { .. } => ReconcileErrorKind::ProviderUnavailable,
            ReconcileError::Provider { .. } => ReconcileErrorKind::ProviderRejected,
            ReconcileError::UnknownState { .. } => ReconcileErrorKind::UnknownState,
        }
    }
}

impl From<Exhausted> for ReconcileError {
    fn from(exhausted: Exhausted) -> Self {
        if exhausted.error.is_retryable() {
            ReconcileError::ProviderUnavailable {
                attempts: exhausted.attempts,
                source: exhausted.error,
            }
        } else {
            ReconcileError::Provider {
                source: exhausted.error,
            }
        }
    }
}

fn join_ids(ids: &[InstanceId]) -> String {
    ids.iter()
        .map(InstanceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
