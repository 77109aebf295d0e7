// ABOUTME: Operator-selected policy for resources that already exist.
// ABOUTME: Parsed once from DB_ACTION and applied uniformly to every step.

use std::fmt;
use std::str::FromStr;

/// How a step treats a resource that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionMode {
    /// Leave existing resources untouched.
    #[default]
    Ignore,
    /// Delete the narrower sub-resource (database and user) and recreate it.
    Drop,
    /// Delete the broader parent resource (the whole instance) and recreate it.
    Destroy,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown action mode {0:?} (expected ignore, drop, or destroy)")]
pub struct ParseActionModeError(String);

impl ActionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMode::Ignore => "ignore",
            ActionMode::Drop => "drop",
            ActionMode::Destroy => "destroy",
        }
    }

    pub fn is_destructive(&self) -> bool {
        !matches!(self, ActionMode::Ignore)
    }
}

impl FromStr for ActionMode {
    type Err = ParseActionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "ignore" | "none" => Ok(ActionMode::Ignore),
            "drop" | "drop_db" => Ok(ActionMode::Drop),
            "destroy" | "destroy_instance" => Ok(ActionMode::Destroy),
            _ => Err(ParseActionModeError(s.to_string())),
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
