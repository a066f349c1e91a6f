// ABOUTME: Create template for machines and per-machine overrides.
// ABOUTME: Overrides replace template fields, except labels which are merged.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::provider::InstanceSpec;
use crate::types::MachineName;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MachineTemplate {
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default)]
    pub location: Option<String>,

    /// Names or ids of SSH keys registered with the provider.
    #[serde(default)]
    pub ssh_keys: Vec<String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Cloud-init user data.
    #[serde(default)]
    pub user_data: Option<String>,
}

fn default_instance_type() -> String {
    "cx22".to_string()
}

fn default_image() -> String {
    "ubuntu-24.04".to_string()
}

impl Default for MachineTemplate {
    fn default() -> Self {
        MachineTemplate {
            instance_type: default_instance_type(),
            image: default_image(),
            location: None,
            ssh_keys: Vec::new(),
            labels: BTreeMap::new(),
            user_data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MachineOverride {
    #[serde(default)]
    pub instance_type: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub ssh_keys: Option<Vec<String>>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub user_data: Option<String>,
}

impl MachineTemplate {
    pub fn merged(&self, overrides: &MachineOverride) -> MachineTemplate {
        let mut merged = self.clone();

        if let Some(ref instance_type) = overrides.instance_type {
            merged.instance_type = instance_type.clone();
        }
        if let Some(ref image) = overrides.image {
            merged.image = image.clone();
        }
        if overrides.location.is_some() {
            merged.location = overrides.location.clone();
        }
        if let Some(ref keys) = overrides.ssh_keys {
            merged.ssh_keys = keys.clone();
        }
        if overrides.user_data.is_some() {
            merged.user_data = overrides.user_data.clone();
        }
        for (k, v) in &overrides.labels {
            merged.labels.insert(k.clone(), v.clone());
        }

        merged
    }

    pub fn instance_spec(&self, name: &MachineName) -> InstanceSpec {
        InstanceSpec {
            name: name.clone(),
            instance_type: self.instance_type.clone(),
            image: self.image.clone(),
            location: self.location.clone(),
            ssh_keys: self.ssh_keys.clone(),
            labels: self.labels.clone(),
            user_data: self.user_data.clone(),
        }
    }
}
