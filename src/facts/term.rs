use regex::{Regex, RegexBuilder};
use std::fmt;

/// Case-insensitive, whole-string lookup key for a fact term.
///
/// The raw term is escaped before compiling, so `c++` or `what.ever` match
/// themselves literally and never act as pattern syntax.
#[derive(Clone)]
pub struct MatchKey {
    term: String,
    pattern: Option<Regex>,
}

impl MatchKey {
    pub fn new(term: &str) -> Self {
        // An escaped term only fails to compile when it exceeds the size limit.
        let pattern = RegexBuilder::new(&format!("^{}$", regex::escape(term)))
            .case_insensitive(true)
            .build()
            .map_err(|e| tracing::warn!(len = term.len(), "term pattern rejected: {e}"))
            .ok();
        Self {
            term: term.to_string(),
            pattern,
        }
    }

    /// The term as typed by the caller.
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(candidate),
            None => candidate.to_lowercase() == self.term.to_lowercase(),
        }
    }

    /// The compiled pattern source, for collaborators that push matching down to storage.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }
}

impl fmt::Debug for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchKey")
            .field("term", &self.term)
            .field("pattern", &self.pattern())
            .finish()
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.term)
    }
}

/// Collapse every run of two or more spaces into a single space.
pub fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}
