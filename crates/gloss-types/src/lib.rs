//! Shared types for the glossary annotation pipeline.
//!
//! Tokens borrow from the document text they were cut from, so a run can
//! classify and re-emit them without copying. [`DictionaryMode`] names the
//! static dictionaries, [`Decision`] is the classifier's verdict for one token,
//! and [`CacheEntry`] is the memoized outcome of an external lookup.
//!
//! ```rust
//! use gloss_types::{DictionaryMode, Token, TokenKind};
//!
//! let mode = DictionaryMode::from_name("micro").unwrap();
//! assert_eq!(mode.as_str(), "micro");
//! let token = Token { kind: TokenKind::Word, text: "pathogen" };
//! assert!(token.is_word());
//! ```

use std::fmt;

/// Lexical class of a token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// A maximal run of whitespace.
    Whitespace,
    /// One of `, . ; : ! ? ( ) " ' [ ] { }`.
    Punctuation,
    /// Anything else, up to the next whitespace or punctuation character.
    Word,
}

/// A non-empty slice of the source text with its lexical class.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl Token<'_> {
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

/// Static dictionary selection. `Combined` is the union of the other five.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum DictionaryMode {
    Micro,
    Genetics,
    Immunology,
    Biology,
    Chemistry,
    #[default]
    Combined,
}

impl DictionaryMode {
    /// Every mode, `Combined` last.
    pub const ALL: [DictionaryMode; 6] = [
        DictionaryMode::Micro,
        DictionaryMode::Genetics,
        DictionaryMode::Immunology,
        DictionaryMode::Biology,
        DictionaryMode::Chemistry,
        DictionaryMode::Combined,
    ];

    /// The five source dictionaries in union order; later entries win on collision.
    pub const SOURCES: [DictionaryMode; 5] = [
        DictionaryMode::Micro,
        DictionaryMode::Genetics,
        DictionaryMode::Immunology,
        DictionaryMode::Biology,
        DictionaryMode::Chemistry,
    ];

    /// Parse a dictionary name (case-insensitive, surrounding whitespace ignored).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "micro" => Some(DictionaryMode::Micro),
            "genetics" => Some(DictionaryMode::Genetics),
            "immunology" => Some(DictionaryMode::Immunology),
            "biology" => Some(DictionaryMode::Biology),
            "chemistry" => Some(DictionaryMode::Chemistry),
            "combined" => Some(DictionaryMode::Combined),
            _ => None,
        }
    }

    /// Name used in configuration and as the source label on tagged terms.
    pub fn as_str(self) -> &'static str {
        match self {
            DictionaryMode::Micro => "micro",
            DictionaryMode::Genetics => "genetics",
            DictionaryMode::Immunology => "immunology",
            DictionaryMode::Biology => "biology",
            DictionaryMode::Chemistry => "chemistry",
            DictionaryMode::Combined => "combined",
        }
    }
}

impl fmt::Display for DictionaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run switches. These alone determine how a token is classified.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AnnotateConfig {
    pub dictionary_mode: DictionaryMode,
    pub scientific: bool,
    pub simple_english: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            dictionary_mode: DictionaryMode::Combined,
            scientific: true,
            simple_english: false,
        }
    }
}

/// Classifier verdict for a single token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision<'a> {
    /// Emit the raw text untouched.
    PassThrough,
    /// Tag with an inline definition from the active dictionary.
    CatalogTerm {
        definition: &'a str,
        dictionary: DictionaryMode,
    },
    /// Common word or proper name; emit raw.
    Skip,
    /// Eligible for the external dictionary; emit raw if nothing is found.
    ExternalCandidate,
}

/// Memoized outcome of an external lookup.
///
/// "Never looked up" is represented by the absence of an entry, not by a
/// variant here.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheEntry {
    Defined(String),
    Absent,
}

impl CacheEntry {
    pub fn definition(&self) -> Option<&str> {
        match self {
            CacheEntry::Defined(text) => Some(text.as_str()),
            CacheEntry::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CacheEntry::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_names_round_trip() {
        for mode in DictionaryMode::ALL {
            assert_eq!(DictionaryMode::from_name(mode.as_str()), Some(mode));
        }
        assert_eq!(
            DictionaryMode::from_name(" Genetics "),
            Some(DictionaryMode::Genetics)
        );
        assert_eq!(DictionaryMode::from_name("physics"), None);
    }

    #[test]
    fn sources_exclude_combined() {
        assert!(!DictionaryMode::SOURCES.contains(&DictionaryMode::Combined));
        assert_eq!(DictionaryMode::SOURCES[0], DictionaryMode::Micro);
        assert_eq!(DictionaryMode::SOURCES[4], DictionaryMode::Chemistry);
    }

    #[test]
    fn cache_entry_exposes_definition() {
        let defined = CacheEntry::Defined("a small dog".into());
        assert_eq!(defined.definition(), Some("a small dog"));
        assert!(!defined.is_absent());
        assert_eq!(CacheEntry::Absent.definition(), None);
        assert!(CacheEntry::Absent.is_absent());
    }
}
