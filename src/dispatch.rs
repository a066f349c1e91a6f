// ABOUTME: Command dispatch: maps `vs <target> [<verb>] [args]` onto an invocation.
// ABOUTME: Global command tokens are matched before machine names.

use std::fmt;

use crate::error::{Error, Result};
use crate::types::MachineName;

/// Commands that act on the whole account rather than one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalCommand {
    Status,
    Init,
}

/// Commands that act on a single machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Up,
    Halt,
    Destroy,
    Status,
    Ssh,
    Scp,
    Console,
}

const GLOBAL_COMMANDS: &[(&str, GlobalCommand)] = &[
    ("status", GlobalCommand::Status),
    ("init", GlobalCommand::Init),
];

const VERBS: &[(&str, Verb)] = &[
    ("up", Verb::Up),
    ("halt", Verb::Halt),
    ("destroy", Verb::Destroy),
    ("status", Verb::Status),
    ("ssh", Verb::Ssh),
    ("scp", Verb::Scp),
    ("console", Verb::Console),
];

impl GlobalCommand {
    pub fn from_token(token: &str) -> Option<Self> {
        GLOBAL_COMMANDS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, command)| *command)
    }
}

impl Verb {
    pub fn from_token(token: &str) -> Option<Self> {
        VERBS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, verb)| *verb)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Up => "up",
            Verb::Halt => "halt",
            Verb::Destroy => "destroy",
            Verb::Status => "status",
            Verb::Ssh => "ssh",
            Verb::Scp => "scp",
            Verb::Console => "console",
        }
    }

    /// Whether trailing arguments are handed through to an external program.
    pub fn passes_args(&self) -> bool {
        matches!(self, Verb::Ssh | Verb::Scp)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Status,
    Init {
        force: bool,
    },
    Machine {
        name: MachineName,
        verb: Verb,
        args: Vec<String>,
    },
}

/// Resolve the positional part of a command line.
///
/// # Errors
///
/// - `UnknownCommand` for an unrecognized verb or argument to a global command.
/// - `MissingCommand` when a machine name is given without a verb.
/// - `InvalidMachineName` when the target is neither a global command nor a valid name.
pub fn resolve(target: &str, rest: &[String]) -> Result<Invocation> {
    if let Some(command) = GlobalCommand::from_token(target) {
        return resolve_global(command, rest);
    }

    let name = MachineName::new(target).map_err(|source| Error::InvalidMachineName {
        name: target.to_string(),
        source,
    })?;

    let (token, args) = rest
        .split_first()
        .ok_or_else(|| Error::MissingCommand(target.to_string()))?;
    let verb = Verb::from_token(token).ok_or_else(|| Error::UnknownCommand(token.clone()))?;

    if !verb.passes_args() && !args.is_empty() {
        tracing::warn!(%verb, ?args, "ignoring extra arguments");
    }

    Ok(Invocation::Machine {
        name,
        verb,
        args: args.to_vec(),
    })
}

fn resolve_global(command: GlobalCommand, rest: &[String]) -> Result<Invocation> {
    match command {
        GlobalCommand::Status => match rest.first() {
            None => Ok(Invocation::Status),
            Some(arg) => Err(Error::UnknownCommand(arg.clone())),
        },
        GlobalCommand::Init => {
            let mut force = false;
            for arg in rest {
                match arg.as_str() {
                    "-f" | "--force" => force = true,
                    other => return Err(Error::UnknownCommand(other.to_string())),
                }
            }
            Ok(Invocation::Init { force })
        }
    }
}
