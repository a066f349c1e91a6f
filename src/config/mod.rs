// ABOUTME: Configuration types and parsing for vs.yml.
// ABOUTME: Handles discovery, defaults when no file exists, and per-machine overrides.

mod env_value;
mod init;
mod machine;
mod provider;
mod ssh;

pub use env_value::EnvValue;
pub use init::init_config;
pub use machine::{MachineOverride, MachineTemplate};
pub use provider::{ProviderConfig, ProviderKind};
pub use ssh::SshConfig;

use crate::error::{Error, Result};
use crate::machine::ReconcileSettings;
use crate::provider::{InstanceSpec, MANAGED_TAG, NAME_TAG, RetryPolicy};
use crate::types::MachineName;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "vs.yml";
pub const CONFIG_FILENAME_ALT: &str = "vs.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".vs/config.yml";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Create template shared by all machines.
    #[serde(default)]
    pub machine: MachineTemplate,

    #[serde(default)]
    pub reconcile: ReconcileSettings,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub machines: BTreeMap<String, MachineOverride>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is valid and means all defaults.
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`, or the defaults if there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        tracing::debug!(dir = %dir.display(), "no configuration file found, using defaults");
        Ok(Config::default())
    }

    /// The create template for `name` with its overrides applied.
    pub fn for_machine(&self, name: &MachineName) -> MachineTemplate {
        match self.machines.get(name.as_str()) {
            Some(overrides) => self.machine.merged(overrides),
            None => self.machine.clone(),
        }
    }

    pub fn instance_spec(&self, name: &MachineName) -> InstanceSpec {
        self.for_machine(name).instance_spec(name)
    }

    fn validate(&self) -> Result<()> {
        for name in self.machines.keys() {
            MachineName::new(name).map_err(|source| Error::InvalidMachineName {
                name: name.clone(),
                source,
            })?;
        }

        let label_sets = std::iter::once(("machine", &self.machine.labels)).chain(
            self.machines
                .iter()
                .map(|(name, overrides)| (name.as_str(), &overrides.labels)),
        );
        for (owner, labels) in label_sets {
            for reserved in [NAME_TAG, MANAGED_TAG] {
                if labels.contains_key(reserved) {
                    return Err(Error::InvalidConfig(format!(
                        "label '{reserved}' in {owner} is reserved"
                    )));
                }
            }
        }

        if self.reconcile.max_polls == 0 {
            return Err(Error::InvalidConfig(
                "reconcile.max_polls must be at least 1".to_string(),
            ));
        }
        if self.reconcile.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "reconcile.poll_interval must be positive".to_string(),
            ));
        }
        if self.reconcile.timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "reconcile.timeout must be positive".to_string(),
            ));
        }
        if self.retry.attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
