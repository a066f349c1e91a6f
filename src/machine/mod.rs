// ABOUTME: Machine lifecycle: canonical state model, observation, and reconciliation.
// ABOUTME: Machine records are rebuilt from a live provider query on every command.

mod error;
mod observer;
mod reconcile;
mod state;

pub use error::{ReconcileError, ReconcileErrorKind};
pub use observer::{InstanceSummary, StateObserver};
pub use reconcile::{Outcome, ReconcileSettings, Reconciler};
pub use state::{CanonicalState, Goal, Mutation, Step, plan};

use crate::provider::InstanceRecord;
use crate::types::{InstanceId, MachineName};
use serde::Serialize;
use std::collections::BTreeMap;

/// A machine as currently seen by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Machine {
    pub name: MachineName,
    /// Set for every state except `Absent`.
    pub instance_id: Option<InstanceId>,
    pub state: CanonicalState,
    pub instance_type: Option<String>,
    pub address: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl Machine {
    pub fn absent(name: MachineName) -> Self {
        Machine {
            name,
            instance_id: None,
            state: CanonicalState::Absent,
            instance_type: None,
            address: None,
            tags: BTreeMap::new(),
        }
    }

    fn from_record(name: MachineName, record: InstanceRecord, state: CanonicalState) -> Self {
        Machine {
            name,
            instance_id: Some(record.id),
            state,
            instance_type: record.instance_type,
            address: record.public_address,
            tags: record.tags,
        }
    }
}
