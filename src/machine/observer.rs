// ABOUTME: State observer: one provider listing normalized into a Machine record.
// ABOUTME: Zero live matches is absent or terminated; more than one is ambiguous.

use serde::Serialize;
use snafu::OptionExt;
use tracing::{debug, warn};

use super::Machine;
use super::error::{AmbiguousMachineSnafu, ReconcileError, UnknownStateSnafu};
use super::state::CanonicalState;
use crate::provider::{InstanceRecord, ProviderGateway, RetryPolicy, with_retry};
use crate::types::MachineName;

/// An instance row for the global status listing.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    #[serde(flatten)]
    pub record: InstanceRecord,
    /// `None` when the provider status is outside the normalization table.
    pub canonical_state: Option<CanonicalState>,
}

/// Reads machine state from the provider. Never caches.
pub struct StateObserver<'a, G: ?Sized> {
    gateway: &'a G,
    retry: RetryPolicy,
}

impl<'a, G: ProviderGateway + ?Sized> StateObserver<'a, G> {
    pub fn new(gateway: &'a G, retry: RetryPolicy) -> Self {
        Self { gateway, retry }
    }

    /// Observe the machine with the given name.
    ///
    /// Terminated instances are kept by some providers for a while after a
    /// machine was recreated, so they only decide the state when no live
    /// instance carries the name.
    ///
    /// # Errors
    ///
    /// - `AmbiguousMachine` if more than one live instance carries the name.
    /// - `UnknownState` if a matching instance reports an unmapped status.
    /// - `ProviderUnavailable` once listing failures exhaust the retry policy.
    pub async fn observe(&self, name: &MachineName) -> Result<Machine, ReconcileError> {
        let gateway = self.gateway;
        let records = with_retry(&self.retry, "list instances", move || {
            gateway.list_instances(Some(name))
        })
        .await?;

        let mut live = Vec::new();
        let mut gone = Vec::new();

        for record in records {
            // The gateway filters by tag, but do not trust a loose provider-side match.
            if record.name_tag() != Some(name.as_str()) {
                continue;
            }

            let state = CanonicalState::from_provider(&record.state).context(UnknownStateSnafu {
                name: name.clone(),
                status: record.state.clone(),
            })?;

            if state.is_gone() {
                gone.push((record, state));
            } else {
                live.push((record, state));
            }
        }

        if live.len() > 1 {
            let ids = live.into_iter().map(|(record, _)| record.id).collect::<Vec<_>>();
            return AmbiguousMachineSnafu {
                name: name.clone(),
                ids,
            }
            .fail();
        }

        let machine = match (live.pop(), gone.into_iter().next()) {
            (Some((record, state)), leftover) => {
                if let Some((old, _)) = leftover {
                    warn!(
                        machine = %name,
                        ignored = %old.id,
                        "ignoring terminated instance alongside live one"
                    );
                }
                Machine::from_record(name.clone(), record, state)
            }
            (None, Some((record, state))) => Machine::from_record(name.clone(), record, state),
            (None, None) => Machine::absent(name.clone()),
        };

        debug!(
            machine = %name,
            state = %machine.state,
            instance = ?machine.instance_id,
            "observed machine"
        );
        Ok(machine)
    }

    /// Every instance the provider reports, for the global status listing.
    pub async fn list_all(&self) -> Result<Vec<InstanceSummary>, ReconcileError> {
        let gateway = self.gateway;
        let records = with_retry(&self.retry, "list instances", move || {
            gateway.list_instances(None)
        })
        .await?;

        let mut summaries: Vec<_> = records
            .into_iter()
            .map(|record| {
                let canonical_state = CanonicalState::from_provider(&record.state);
                InstanceSummary {
                    record,
                    canonical_state,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.record.name.cmp(&b.record.name));

        Ok(summaries)
    }
}
