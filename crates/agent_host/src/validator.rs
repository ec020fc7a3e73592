//! Cheap local rejection of canned refusal replies.
//!
//! Only the opening of a reply is inspected: everything up to and including
//! the first `.`, `!` or `?`, or the first 150 characters when the reply has
//! no sentence terminator at all.

use shared::ChatConfig;

/// Characters inspected when a reply has no sentence terminator.
pub const UNTERMINATED_PREFIX_CHARS: usize = 150;

#[derive(Clone, Debug)]
pub struct Validator {
    /// Lowercased, non-empty phrases.
    phrases: Vec<String>,
}

impl Validator {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(&config.forbidden_phrases)
    }

    /// `false` when the opening of `reply` contains a forbidden phrase.
    ///
    /// An empty reply has an empty opening and is therefore valid.
    pub fn is_valid(&self, reply: &str) -> bool {
        let opening = opening_lowercase(reply);
        !self.phrases.iter().any(|p| opening.contains(p.as_str()))
    }
}

/// The lowercased part of `reply` the validator looks at.
pub fn opening_lowercase(reply: &str) -> String {
    let s = reply.trim();
    match s.find(|c: char| matches!(c, '.' | '!' | '?')) {
        // Terminators are ASCII, so `end + 1` is a char boundary.
        Some(end) => s[..end + 1].to_lowercase(),
        None => s
            .chars()
            .take(UNTERMINATED_PREFIX_CHARS)
            .collect::<String>()
            .to_lowercase(),
    }
}
