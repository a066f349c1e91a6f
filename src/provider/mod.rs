// ABOUTME: Provider gateway: the narrow contract over a cloud compute control API.
// ABOUTME: Every call only triggers work; completion is confirmed by listing again.

mod error;
pub mod hetzner;
mod retry;

pub use error::ProviderError;
pub use hetzner::HetznerGateway;
pub use retry::{Exhausted, RetryPolicy, with_retry};

use crate::config::{ProviderConfig, ProviderKind};
use crate::types::{InstanceId, MachineName};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Label/tag key that binds a provider instance to a machine name.
pub const NAME_TAG: &str = "vs-machine";

/// Label marking instances created by this tool.
pub const MANAGED_TAG: &str = "vs-managed";

/// One instance as reported by the provider, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub name: String,
    /// Raw provider status string (e.g. "running", "off").
    pub state: String,
    pub instance_type: Option<String>,
    pub public_address: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl InstanceRecord {
    /// The machine name this instance is tagged with, if any.
    pub fn name_tag(&self) -> Option<&str> {
        self.tags.get(NAME_TAG).map(String::as_str)
    }
}

/// What to create when a machine has to be brought into existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    pub name: MachineName,
    pub instance_type: String,
    pub image: String,
    pub location: Option<String>,
    pub ssh_keys: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub user_data: Option<String>,
}

impl InstanceSpec {
    /// Labels sent to the provider: user labels plus the name and managed tags.
    pub fn provider_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels.clone();
        labels.insert(NAME_TAG.to_string(), self.name.to_string());
        labels.insert(MANAGED_TAG.to_string(), "true".to_string());
        labels
    }
}

/// Credentials for the provider's out-of-band console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleAccess {
    pub url: String,
    pub password: String,
}

/// Cloud compute operations used by the reconciler.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// List instances, optionally only those tagged with the given machine name.
    async fn list_instances(
        &self,
        name_tag: Option<&MachineName>,
    ) -> Result<Vec<InstanceRecord>, ProviderError>;

    /// Create an instance. Creation implies start.
    async fn create_instance(&self, spec: &InstanceSpec) -> Result<InstanceId, ProviderError>;

    /// Power on a stopped instance.
    async fn start_instance(&self, id: &InstanceId) -> Result<(), ProviderError>;

    /// Shut down a running instance, preserving its disk.
    async fn stop_instance(&self, id: &InstanceId) -> Result<(), ProviderError>;

    /// Destroy an instance permanently.
    async fn terminate_instance(&self, id: &InstanceId) -> Result<(), ProviderError>;

    /// Request access to the instance's out-of-band console.
    async fn request_console(&self, _id: &InstanceId) -> Result<ConsoleAccess, ProviderError> {
        Err(ProviderError::Unsupported("console access"))
    }
}

/// Build the configured gateway.
///
/// The provider session (endpoint, credentials, location) is passed in
/// explicitly; nothing is read from ambient state besides the token's env var.
pub fn connect(config: &ProviderConfig) -> crate::error::Result<Box<dyn ProviderGateway>> {
    match config.kind {
        ProviderKind::Hetzner => {
            let token = config.token.resolve()?;
            tracing::debug!(endpoint = %config.endpoint, token = %config.token, "using hetzner cloud gateway");
            Ok(Box::new(HetznerGateway::new(
                &config.endpoint,
                token,
                config.location.clone(),
            )))
        }
    }
}
