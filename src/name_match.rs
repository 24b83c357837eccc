//! Tolerant comparison of a staged file name with an ingested one.
//!
//! Staging areas tend to mangle names (spaces turned into underscores,
//! suffixes appended, extensions re-cased by tools). The candidate name is
//! split on separator characters and the remaining tokens must appear in
//! the stored name in the same order, with anything in between. This is
//! the pattern `*tok1*tok2*…*tokN*`: case-sensitive, not anchored to
//! either end of the stored name.

use std::fmt;

/// Characters a candidate name is split on.
pub const SEPARATORS: [char; 5] = [' ', '#', '.', '_', '-'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<String>,
}

impl NamePattern {
    pub fn new(candidate: &str) -> Self {
        let tokens = candidate
            .split(SEPARATORS)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether every token occurs in `stored`, in order, without overlap.
    ///
    /// Taking the leftmost occurrence of each token is enough: any later
    /// occurrence leaves less room for the tokens that follow. A pattern
    /// without tokens matches every name.
    pub fn is_match(&self, stored: &str) -> bool {
        let mut rest = stored;
        for token in &self.tokens {
            match rest.find(token.as_str()) {
                Some(at) => rest = &rest[at + token.len()..],
                None => return false,
            }
        }
        true
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}*", self.tokens.join("*"))
    }
}

/// Convenience wrapper for a single comparison.
pub fn names_match(candidate: &str, stored: &str) -> bool {
    NamePattern::new(candidate).is_match(stored)
}
