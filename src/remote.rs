// ABOUTME: Remote access to a running machine through the system ssh and scp binaries.
// ABOUTME: Builds argument lists, rewrites scp operands, and propagates exit codes.

use std::process::Stdio;
use tokio::process::Command;

use crate::config::SshConfig;
use crate::error::{Error, Result};
use crate::machine::{CanonicalState, Machine};
use crate::types::MachineName;

/// A running machine's SSH endpoint.
#[derive(Debug, Clone)]
pub struct RemoteTarget<'a> {
    name: &'a MachineName,
    address: &'a str,
    ssh: &'a SshConfig,
}

impl<'a> RemoteTarget<'a> {
    /// # Errors
    ///
    /// Returns `NotReachable` unless the machine is running with a public address.
    pub fn new(machine: &'a Machine, ssh: &'a SshConfig) -> Result<Self> {
        match (&machine.state, &machine.address) {
            (CanonicalState::Running, Some(address)) => Ok(RemoteTarget {
                name: &machine.name,
                address,
                ssh,
            }),
            _ => Err(Error::NotReachable {
                name: machine.name.clone(),
                state: machine.state,
            }),
        }
    }

    /// `user@address`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.ssh.user, self.address)
    }

    fn common_options(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec![port_flag.to_string(), self.ssh.port.to_string()];
        if let Some(ref identity) = self.ssh.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        for option in &self.ssh.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args
    }

    pub fn ssh_args(&self, extra: &[String]) -> Vec<String> {
        let mut args = self.common_options("-p");
        args.push(self.destination());
        args.extend(extra.iter().cloned());
        args
    }

    pub fn scp_args(&self, operands: &[String]) -> Vec<String> {
        let destination = self.destination();
        let mut args = self.common_options("-P");
        args.extend(
            operands
                .iter()
                .map(|operand| rewrite_scp_operand(operand, self.name, &destination)),
        );
        args
    }
}

/// Point `:path` and `<machine>:path` operands at the machine's address.
///
/// Flags and operands naming other hosts are passed through untouched.
pub fn rewrite_scp_operand(operand: &str, name: &MachineName, destination: &str) -> String {
    if operand.starts_with('-') {
        return operand.to_string();
    }

    match operand.split_once(':') {
        Some(("", path)) => format!("{destination}:{path}"),
        Some((host, path)) if host == name.as_str() => format!("{destination}:{path}"),
        _ => operand.to_string(),
    }
}

/// Run `program` attached to the terminal and wait for it to exit.
///
/// # Errors
///
/// - `RemoteLaunch` if the program cannot be started.
/// - `RemoteExit` if it exits unsuccessfully; the exit code is carried along.
pub async fn run_interactive(program: &str, args: &[String]) -> Result<()> {
    tracing::debug!(program, ?args, "launching remote session");

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| Error::RemoteLaunch {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        tracing::debug!(program, code = ?status.code(), "remote session failed");
        Err(Error::RemoteExit {
            program: program.to_string(),
            code: status.code(),
        })
    }
}
