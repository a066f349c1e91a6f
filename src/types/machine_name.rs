// ABOUTME: DNS-compatible machine name validation.
// ABOUTME: Machine names become provider server names, so they follow RFC 1123 labels.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineNameError {
    #[error("machine name cannot be empty")]
    Empty,

    #[error("machine name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("machine name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("machine name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("machine name must be lowercase")]
    NotLowercase,

    #[error("invalid character in machine name: '{0}'")]
    InvalidChar(char),
}

/// Longest RFC 1123 label, in bytes.
const MAX_LEN: usize = 63;

/// User-chosen, stable name of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineName(String);

impl MachineName {
    pub fn new(value: &str) -> Result<Self, MachineNameError> {
        let last = value.len().checked_sub(1).ok_or(MachineNameError::Empty)?;
        if value.len() > MAX_LEN {
            return Err(MachineNameError::TooLong);
        }

        for (at, c) in value.char_indices() {
            match c {
                'a'..='z' | '0'..='9' => {}
                '-' if at == 0 => return Err(MachineNameError::StartsWithHyphen),
                '-' if at == last => return Err(MachineNameError::EndsWithHyphen),
                '-' => {}
                'A'..='Z' => return Err(MachineNameError::NotLowercase),
                other => return Err(MachineNameError::InvalidChar(other)),
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MachineName {
    type Err = MachineNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for MachineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MachineName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MachineName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MachineName::new(&s).map_err(serde::de::Error::custom)
    }
}
