// ABOUTME: Extra service environment values from the config file.
// ABOUTME: Literal strings or references to pipeline variables with defaults.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::Vars;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromVar {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self, vars: &Vars) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromVar { var, default } => vars
                .get(var)
                .map(str::to_string)
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }
}

pub fn resolve_env_map(
    map: &BTreeMap<String, EnvValue>,
    vars: &Vars,
) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve(vars).map(|resolved| (k.clone(), resolved)))
        .collect()
}
