// ABOUTME: Application-wide error types for vs.
// ABOUTME: Uses thiserror; every variant maps to a process exit code at the command boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::machine::{CanonicalState, ReconcileError};
use crate::provider::ProviderError;
use crate::types::{MachineName, MachineNameError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid machine name '{name}': {source}")]
    InvalidMachineName {
        name: String,
        source: MachineNameError,
    },

    #[error("unrecognized command: {0}")]
    UnknownCommand(String),

    #[error("no command given for machine '{0}'")]
    MissingCommand(String),

    #[error("machine '{name}' is not reachable (state: {state})")]
    NotReachable {
        name: MachineName,
        state: CanonicalState,
    },

    #[error("failed to launch {program}: {source}")]
    RemoteLaunch {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {}", match .code { Some(code) => format!("status {code}"), None => "a signal".to_string() })]
    RemoteExit { program: String, code: Option<i32> },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the user should be shown the usage text.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::UnknownCommand(_) | Error::MissingCommand(_))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::RemoteExit {
                code: Some(code), ..
            } if *code != 0 => *code,
            e if e.is_usage() => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_with_two() {
        let err = Error::UnknownCommand("reboot".into());
        assert!(err.is_usage());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn remote_exit_code_is_propagated() {
        let err = Error::RemoteExit {
            program: "ssh".into(),
            code: Some(255),
        };
        assert_eq!(err.exit_code(), 255);
        assert_eq!(err.to_string(), "ssh exited with status 255");

        let killed = Error::RemoteExit {
            program: "scp".into(),
            code: None,
        };
        assert_eq!(killed.exit_code(), 1);
        assert_eq!(killed.to_string(), "scp exited with a signal");
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(Error::MissingEnvVar("HCLOUD_TOKEN".into()).exit_code(), 1);
    }
}
