// ABOUTME: SSH section of vs.yml: how remote sessions reach a machine.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    /// Extra `-o` options passed to ssh and scp, e.g. `StrictHostKeyChecking=accept-new`.
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

impl Default for SshConfig {
    fn default() -> Self {
        SshConfig {
            user: default_user(),
            port: default_port(),
            identity_file: None,
            options: Vec::new(),
        }
    }
}
