// ABOUTME: DNS-compatible cloud resource name validation.
// ABOUTME: Names must start with a letter and follow RFC 1123 label rules.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceNameError {
    #[error("resource name cannot be empty")]
    Empty,

    #[error("resource name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("resource name must start with a lowercase letter")]
    StartsWithNonLetter,

    #[error("resource name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("resource name must be lowercase")]
    NotLowercase,

    #[error("invalid character in resource name: '{0}'")]
    InvalidChar(char),
}

/// Name of a provider-side resource (instance, connector, service, repository).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(value: &str) -> Result<Self, ResourceNameError> {
        if value.is_empty() {
            return Err(ResourceNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ResourceNameError::TooLong);
        }

        if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
            if value.starts_with(|c: char| c.is_ascii_uppercase()) {
                return Err(ResourceNameError::NotLowercase);
            }
            return Err(ResourceNameError::StartsWithNonLetter);
        }

        if value.ends_with('-') {
            return Err(ResourceNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ResourceNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(ResourceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a child name by appending a hyphenated suffix.
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, ResourceNameError> {
        Self::new(&format!("{}-{}", self.0, suffix))
    }
}

impl FromStr for ResourceName {
    type Err = ResourceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
