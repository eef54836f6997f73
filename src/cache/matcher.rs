//! Key pattern matching for getMatching
//!
//! Patterns are regular expressions that must match the whole key.

use regex::Regex;
use std::collections::HashSet;

/// Compiled whole-key pattern
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    regex: Regex,
}

impl KeyMatcher {
    /// Compile a pattern; it is anchored at both ends
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// Select the keys matching this pattern
    pub fn matching_keys<'a, I>(&self, keys: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keys.into_iter()
            .filter(|key| self.is_match(key))
            .cloned()
            .collect()
    }
}
