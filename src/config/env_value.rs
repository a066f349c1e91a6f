// ABOUTME: Configuration values that may be read from the environment.
// ABOUTME: Either a literal string or `{ env: VAR, default: ... }`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn from_env(var: impl Into<String>) -> Self {
        EnvValue::FromEnv {
            var: var.into(),
            default: None,
        }
    }

    /// Resolve to a string. An env var that is set but empty counts as missing.
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) if !val.is_empty() => Ok(val),
                _ => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

// Never prints literal values: tokens end up here.
impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Literal(_) => f.write_str("<literal>"),
            EnvValue::FromEnv { var, .. } => write!(f, "${var}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::Literal("abc".into());
        assert_eq!(value.resolve().unwrap(), "abc");
        assert_eq!(value.to_string(), "<literal>");
    }

    #[test]
    fn env_reference_uses_variable_then_default() {
        let value = EnvValue::FromEnv {
            var: "VS_TEST_ENV_VALUE".into(),
            default: Some("fallback".into()),
        };

        temp_env::with_var("VS_TEST_ENV_VALUE", Some("from-env"), || {
            assert_eq!(value.resolve().unwrap(), "from-env");
        });
        temp_env::with_var_unset("VS_TEST_ENV_VALUE", || {
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
    }

    #[test]
    fn missing_variable_without_default_is_an_error() {
        let value = EnvValue::from_env("VS_TEST_ENV_MISSING");
        temp_env::with_var("VS_TEST_ENV_MISSING", Some(""), || {
            let err = value.resolve().unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(ref v) if v == "VS_TEST_ENV_MISSING"));
        });
    }

    #[test]
    fn deserializes_both_forms() {
        let literal: EnvValue = serde_yaml::from_str("plain").unwrap();
        assert_eq!(literal, EnvValue::Literal("plain".into()));

        let reference: EnvValue = serde_yaml::from_str("{ env: HCLOUD_TOKEN }").unwrap();
        assert_eq!(reference, EnvValue::from_env("HCLOUD_TOKEN"));
    }
}
