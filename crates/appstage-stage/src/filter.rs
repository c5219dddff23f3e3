//! Entry selection by regular expression.

use regex::Regex;

use crate::error::{StageError, StageResult};

/// Compiled alternation of the descriptor's extraction patterns.
///
/// Matching is unanchored: a name is selected when any fragment matches
/// anywhere in it. An empty fragment list selects nothing.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    regex: Option<Regex>,
}

impl EntryFilter {
    /// Join `patterns` with `|` and compile the result once.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::PatternSyntax`] when the combined expression is invalid.
    pub fn build<S: AsRef<str>>(patterns: &[S]) -> StageResult<Self> {
        if patterns.is_empty() {
            return Ok(Self { regex: None });
        }
        let joined = patterns
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&joined).map_err(|source| StageError::PatternSyntax {
            pattern: joined.clone(),
            source,
        })?;
        Ok(Self { regex: Some(regex) })
    }

    /// Whether `name` is selected.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(name))
    }

    /// Combined expression, if any fragments were supplied.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }
}
