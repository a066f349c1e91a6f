// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented vs.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# vs configuration
provider:
  kind: hetzner
  # API token; read from the environment (or a .env file) by default
  token: { env: HCLOUD_TOKEN }
  # location: fsn1

# Template used when a machine has to be created
machine:
  instance_type: cx22
  image: ubuntu-24.04
  # SSH keys registered with the provider, by name
  ssh_keys: []
  labels: {}

reconcile:
  poll_interval: 5s
  timeout: 5m
  max_polls: 120

retry:
  attempts: 3
  initial_backoff: 1s
  max_backoff: 10s

ssh:
  user: root
  port: 22
  # options: ["StrictHostKeyChecking=accept-new"]

# Per-machine overrides of the template
machines: {}
  # web1:
  #   instance_type: cx32
"#;

/// Write `vs.yml` into `dir`, refusing to overwrite unless `force` is set.
pub fn init_config(dir: &Path, force: bool) -> Result<std::path::PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;

    Ok(config_path)
}
