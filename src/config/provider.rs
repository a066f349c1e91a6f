// ABOUTME: Provider section of vs.yml: which cloud to talk to and how.
// ABOUTME: The token defaults to the HCLOUD_TOKEN environment variable.

use serde::Deserialize;

use super::EnvValue;
use crate::provider::hetzner::DEFAULT_ENDPOINT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Hetzner,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    #[serde(default = "default_token")]
    pub token: EnvValue,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Location for new instances when the machine template names none.
    #[serde(default)]
    pub location: Option<String>,
}

fn default_token() -> EnvValue {
    EnvValue::from_env("HCLOUD_TOKEN")
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            kind: ProviderKind::default(),
            token: default_token(),
            endpoint: default_endpoint(),
            location: None,
        }
    }
}
