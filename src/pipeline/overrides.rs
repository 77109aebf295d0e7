// ABOUTME: KEY=VALUE override tokens given on the command line.
// ABOUTME: Overrides shadow both the environment and the state file for one run.

#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("override {0:?} must have the form KEY=VALUE")]
    MissingEquals(String),

    #[error("override {0:?} has an empty key")]
    EmptyKey(String),
}

/// Parsed override tokens in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pairs: Vec<(String, String)>,
}

impl Overrides {
    /// Parse tokens. The key is the text before the first `=`; the value may be empty.
    pub fn parse<I, S>(tokens: I) -> Result<Self, OverrideError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pairs = Vec::new();
        for token in tokens {
            let token = token.as_ref();
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| OverrideError::MissingEquals(token.to_string()))?;
            if key.is_empty() {
                return Err(OverrideError::EmptyKey(token.to_string()));
            }
            pairs.push((key.to_string(), value.to_string()));
        }
        Ok(Self { pairs })
    }

    /// Value of the last token for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl IntoIterator for Overrides {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_equals() {
        let o = Overrides::parse(["DB_PASSWORD=a=b", "REGION=test-region"]).unwrap();
        assert_eq!(o.get("DB_PASSWORD"), Some("a=b"));
        assert_eq!(o.get("REGION"), Some("test-region"));
    }

    #[test]
    fn later_tokens_win() {
        let o = Overrides::parse(["REGION=a", "REGION=b"]).unwrap();
        assert_eq!(o.get("REGION"), Some("b"));
    }

    #[test]
    fn empty_value_is_allowed() {
        let o = Overrides::parse(["DB_ACTION="]).unwrap();
        assert_eq!(o.get("DB_ACTION"), Some(""));
    }

    #[test]
    fn token_without_equals_is_rejected() {
        let err = Overrides::parse(["REGION"]).unwrap_err();
        assert!(matches!(err, OverrideError::MissingEquals(_)));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = Overrides::parse(["=value"]).unwrap_err();
        assert!(matches!(err, OverrideError::EmptyKey(_)));
    }

    #[test]
    fn no_tokens_is_empty() {
        let o = Overrides::parse(Vec::<String>::new()).unwrap();
        assert!(o.is_empty());
    }
}
