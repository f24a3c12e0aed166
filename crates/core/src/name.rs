//! Strongly-typed names used across the domain.
//!
//! Principals, groups and rights are all keyed by human-chosen strings. Each
//! gets its own newtype so a group name can never be passed where a principal
//! name is expected.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Unique name of a principal (user).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalName(String);

/// Unique name of a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupName(String);

/// Name of an atomic right (e.g. `"edit_group"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RightName(String);

fn validate(kind: &str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::validation(format!("{kind} cannot be empty")));
    }
    if value.trim() != value {
        return Err(DomainError::validation(format!(
            "{kind} cannot start or end with whitespace"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(DomainError::validation(format!(
            "{kind} cannot contain control characters"
        )));
    }
    Ok(())
}

macro_rules! impl_name_newtype {
    ($t:ident, $kind:literal) => {
        impl $t {
            /// Validate and wrap a name.
            pub fn new(value: impl Into<String>) -> DomainResult<Self> {
                let value = value.into();
                validate($kind, &value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_name_newtype!(PrincipalName, "principal name");
impl_name_newtype!(GroupName, "group name");
impl_name_newtype!(RightName, "right name");

/// Pre-computed credential hash supplied by the caller.
///
/// Compared for equality only; the hashing scheme is the caller's concern.
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::validation("credential hash cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

impl TryFrom<String> for CredentialHash {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CredentialHash> for String {
    fn from(value: CredentialHash) -> Self {
        value.0
    }
}
