// ABOUTME: Layered variable lookup threaded explicitly through the pipeline.
// ABOUTME: Process environment, then state file, then override tokens, then step writes.

use std::collections::HashMap;
use std::fmt;

use crate::state::StateStore;

/// Where the current value of a variable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Environment,
    State,
    Override,
    Step,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Environment => "environment",
            Origin::State => "state file",
            Origin::Override => "override",
            Origin::Step => "step",
        };
        f.write_str(s)
    }
}

/// Variables visible to provisioning steps.
///
/// Later layers shadow earlier ones. Empty values read as unset, matching
/// `${VAR:-default}` semantics.
#[derive(Debug, Clone, Default)]
pub struct Vars {
    values: HashMap<String, (String, Origin)>,
}

impl Vars {
    /// Start from the current process environment.
    pub fn from_process_env() -> Self {
        let mut vars = Self::default();
        vars.extend(std::env::vars(), Origin::Environment);
        vars
    }

    /// Layer every entry of the state store on top.
    pub fn with_state(mut self, store: &StateStore) -> Self {
        self.extend(
            store.entries().map(|(k, v)| (k.to_string(), v.to_string())),
            Origin::State,
        );
        self
    }

    /// Layer override tokens on top.
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.extend(overrides, Origin::Override);
        self
    }

    fn extend<I>(&mut self, entries: I, origin: Origin)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in entries {
            self.values.insert(key, (value, origin));
        }
    }

    /// Record a value produced by a step. Shadows every earlier layer.
    pub fn set(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), (value.to_string(), Origin::Step));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|(v, _)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn origin(&self, key: &str) -> Option<Origin> {
        self.values.get(key).map(|(_, o)| *o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_shadow_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(dir.path().join("s.env")).unwrap();
        store.put("REGION", "europe-west1").unwrap();

        let vars = Vars::default()
            .with_state(&store)
            .with_overrides(pairs(&[("REGION", "test-region")]));

        assert_eq!(vars.get("REGION"), Some("test-region"));
        assert_eq!(vars.origin("REGION"), Some(Origin::Override));
    }

    #[test]
    fn empty_value_reads_as_unset() {
        let vars = Vars::default().with_overrides(pairs(&[("REGION", "")]));
        assert_eq!(vars.get("REGION"), None);
        assert_eq!(vars.get_or("REGION", "us-central1"), "us-central1");
    }

    #[test]
    fn step_writes_shadow_overrides() {
        let mut vars = Vars::default().with_overrides(pairs(&[("DB_PASSWORD", "old")]));
        vars.set("DB_PASSWORD", "new");
        assert_eq!(vars.get("DB_PASSWORD"), Some("new"));
        assert_eq!(vars.origin("DB_PASSWORD"), Some(Origin::Step));
    }

    #[test]
    fn process_env_is_the_lowest_layer() {
        temp_env::with_var("RUNWAY_TEST_LAYER", Some("from-env"), || {
            let vars = Vars::from_process_env();
            assert_eq!(vars.get("RUNWAY_TEST_LAYER"), Some("from-env"));
            assert_eq!(vars.origin("RUNWAY_TEST_LAYER"), Some(Origin::Environment));

            let vars = vars.with_overrides(pairs(&[("RUNWAY_TEST_LAYER", "from-token")]));
            assert_eq!(vars.get("RUNWAY_TEST_LAYER"), Some("from-token"));
        });
    }
}
