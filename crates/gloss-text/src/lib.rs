//! Tokenization and per-token classification for glossary annotation.
//!
//! The tokenizer is lossless: concatenating the text of every token yields the
//! input byte for byte. Classification follows a fixed precedence and is
//! decoupled from any particular dictionary storage; callers hand in a
//! `catalog_lookup` callback, usually backed by `gloss_catalog::Catalog`.
//!
//! # How it works
//! 1. Whitespace and punctuation pass through untouched.
//! 2. Words are normalized (lower-cased, outer non-alphanumerics stripped).
//! 3. Catalog terms win over everything else when scientific mode is on.
//! 4. Common words and proper-name-shaped tokens are skipped.
//! 5. Remaining words become external lookup candidates if simple-English
//!    mode is on.
//!
//! # Example
//! ```rust
//! use gloss_text::{classify, normalize, tokenize};
//! use gloss_types::{AnnotateConfig, Decision, DictionaryMode};
//!
//! let config = AnnotateConfig {
//!     dictionary_mode: DictionaryMode::Micro,
//!     scientific: true,
//!     simple_english: false,
//! };
//! let lookup = |_mode, term: &str| (term == "pathogen").then_some("A germ.");
//! let decisions: Vec<_> = tokenize("a Pathogen!")
//!     .iter()
//!     .map(|t| classify(t, &normalize(t.text), &config, lookup))
//!     .collect();
//! assert!(matches!(decisions[2], Decision::CatalogTerm { .. }));
//! ```
//!
//! For a runnable demo, see `cargo run -p gloss-text --example classify -- <text>`.

use std::collections::HashSet;
use std::sync::LazyLock;

use gloss_types::{AnnotateConfig, Decision, DictionaryMode, Token, TokenKind};

/// Characters that always form a token of their own.
pub const PUNCTUATION: [char; 14] = [
    ',', '.', ';', ':', '!', '?', '(', ')', '"', '\'', '[', ']', '{', '}',
];

const COMMON_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "than", "when", "while", "of", "in",
    "on", "for", "to", "from", "by", "with", "at", "as", "is", "are", "was", "were", "be",
    "been", "being", "this", "that", "these", "those", "it", "its", "they", "them", "their",
    "he", "she", "his", "her", "we", "us", "our", "you", "your", "i", "me", "my", "can",
    "could", "will", "would", "shall", "should", "may", "might", "do", "does", "did", "have",
    "has", "had", "not", "no", "yes", "so", "such", "just", "very", "more", "most", "some",
    "any", "all", "many", "few", "much", "there", "here", "also", "only", "over", "into",
    "out", "up", "down", "about", "through", "between", "within", "without", "new", "high",
    "low", "large", "small", "big", "little", "long", "short", "old", "young", "use", "make",
    "made", "say", "says", "said", "show", "shows", "shown", "get", "got",
];

static COMMON_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| COMMON_WORDS.iter().copied().collect());

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Lazy, restartable token stream over `text`.
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let (kind, len) = if first.is_whitespace() {
            let len = self
                .rest
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(self.rest.len());
            (TokenKind::Whitespace, len)
        } else if is_punctuation(first) {
            (TokenKind::Punctuation, first.len_utf8())
        } else {
            let len = self
                .rest
                .find(|c: char| c.is_whitespace() || is_punctuation(c))
                .unwrap_or(self.rest.len());
            (TokenKind::Word, len)
        };
        let (text, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(Token { kind, text })
    }
}

/// Split `text` into whitespace, punctuation and word tokens, in order.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    Tokens::new(text).collect()
}

/// Lower-case `word` and strip leading/trailing characters that are not ASCII
/// letters or digits. May return an empty string.
pub fn normalize(word: &str) -> String {
    word.to_lowercase()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

/// Whether a normalized word is on the common-English stoplist.
pub fn is_common_word(normalized: &str) -> bool {
    COMMON_SET.contains(normalized)
}

/// One ASCII capital followed by one or more ASCII lowercase letters, with no
/// `.` or `@` anywhere. Checked against the raw token, not the normalized word.
pub fn looks_like_name(raw: &str) -> bool {
    if raw.contains(['.', '@']) {
        return false;
    }
    let mut bytes = raw.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    let mut tail = 0usize;
    for b in bytes {
        if !b.is_ascii_lowercase() {
            return false;
        }
        tail += 1;
    }
    tail > 0
}

/// Decide how a single token is rendered.
///
/// `catalog_lookup` is only consulted when scientific annotation is enabled;
/// it receives the active dictionary and the normalized word.
pub fn classify<'a, F>(
    token: &Token<'_>,
    normalized: &str,
    config: &AnnotateConfig,
    catalog_lookup: F,
) -> Decision<'a>
where
    F: FnOnce(DictionaryMode, &str) -> Option<&'a str>,
{
    if !token.is_word() || normalized.is_empty() {
        return Decision::PassThrough;
    }

    if config.scientific
        && let Some(definition) = catalog_lookup(config.dictionary_mode, normalized)
    {
        return Decision::CatalogTerm {
            definition,
            dictionary: config.dictionary_mode,
        };
    }

    if is_common_word(normalized) || looks_like_name(token.text) {
        return Decision::Skip;
    }

    if config.simple_english {
        Decision::ExternalCandidate
    } else {
        Decision::PassThrough
    }
}
