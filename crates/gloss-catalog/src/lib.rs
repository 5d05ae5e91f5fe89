//! Static domain dictionaries for glossary annotation.
//!
//! Five small dictionaries ship with the crate (microbiology, genetics,
//! immunology, biology, chemistry). A sixth view, `combined`, is the union of
//! the five, built once in [`DictionaryMode::SOURCES`] order so that later
//! dictionaries override earlier ones when a term appears twice.
//!
//! Extra terms can be layered on top of the built-ins with [`Catalog::load`],
//! which reads optional `<mode>.tsv` files from a directory.
//!
//! # Example
//! ```rust
//! use gloss_catalog::Catalog;
//! use gloss_types::DictionaryMode;
//!
//! let catalog = Catalog::builtin();
//! assert!(catalog.lookup(DictionaryMode::Micro, "pathogen").is_some());
//! assert!(catalog.lookup(DictionaryMode::Combined, "polymer").is_some());
//! assert!(catalog.lookup(DictionaryMode::Genetics, "pathogen").is_none());
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use gloss_types::DictionaryMode;

const MICRO: &[(&str, &str)] = &[
    ("pathogen", "A microorganism that can cause disease."),
    (
        "virulence",
        "The degree of pathogenicity of a microorganism.",
    ),
    (
        "biofilm",
        "A structured community of microorganisms within a matrix.",
    ),
];

const GENETICS: &[(&str, &str)] = &[
    ("genome", "The complete set of DNA in an organism."),
    ("allele", "One of two or more versions of a gene."),
    ("mutation", "A permanent change in DNA sequence."),
];

const IMMUNOLOGY: &[(&str, &str)] = &[
    ("antigen", "A molecule recognized by the immune system."),
    (
        "antibody",
        "A protein produced by B cells that binds antigens.",
    ),
    ("cytokine", "A signaling protein in the immune system."),
];

const BIOLOGY: &[(&str, &str)] = &[
    ("homeostasis", "Maintenance of internal stability."),
    ("metabolism", "Chemical processes that maintain life."),
    ("osmosis", "Diffusion of water across a membrane."),
];

const CHEMISTRY: &[(&str, &str)] = &[
    ("molarity", "Concentration expressed as moles per liter."),
    ("catalyst", "A substance that speeds up a reaction."),
    ("polymer", "A molecule made of repeating units."),
];

fn builtin_entries(mode: DictionaryMode) -> &'static [(&'static str, &'static str)] {
    match mode {
        DictionaryMode::Micro => MICRO,
        DictionaryMode::Genetics => GENETICS,
        DictionaryMode::Immunology => IMMUNOLOGY,
        DictionaryMode::Biology => BIOLOGY,
        DictionaryMode::Chemistry => CHEMISTRY,
        DictionaryMode::Combined => &[],
    }
}

/// Immutable term → definition maps for every [`DictionaryMode`].
#[derive(Clone, Debug)]
pub struct Catalog {
    dictionaries: HashMap<DictionaryMode, HashMap<String, String>>,
}

impl Catalog {
    /// Catalog holding only the built-in dictionaries.
    pub fn builtin() -> Self {
        let sources = DictionaryMode::SOURCES
            .iter()
            .map(|mode| {
                let terms = builtin_entries(*mode)
                    .iter()
                    .map(|(term, def)| (normalize_term(term), (*def).to_string()))
                    .collect();
                (*mode, terms)
            })
            .collect();
        Self::assemble(sources)
    }

    /// Built-ins plus extra terms from `<mode>.tsv` files under `dir`.
    ///
    /// Files are optional; missing ones contribute nothing. Each non-blank,
    /// non-`#` line must be `term<TAB>definition`. Extra terms override
    /// built-ins of the same dictionary. A `combined.tsv` is not read: the
    /// combined view is always derived from the five sources.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut sources = HashMap::new();
        for mode in DictionaryMode::SOURCES {
            let mut terms: HashMap<String, String> = builtin_entries(mode)
                .iter()
                .map(|(term, def)| (normalize_term(term), (*def).to_string()))
                .collect();
            terms.extend(load_tsv(dir.join(format!("{}.tsv", mode.as_str())))?);
            sources.insert(mode, terms);
        }
        Ok(Self::assemble(sources))
    }

    fn assemble(mut sources: HashMap<DictionaryMode, HashMap<String, String>>) -> Self {
        let mut combined = HashMap::new();
        for mode in DictionaryMode::SOURCES {
            if let Some(terms) = sources.get(&mode) {
                combined.extend(terms.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        sources.insert(DictionaryMode::Combined, combined);
        Self {
            dictionaries: sources,
        }
    }

    /// Definition of `term` in `mode`, if present.
    ///
    /// `term` is expected to be normalized already; only ASCII case is folded
    /// here.
    pub fn lookup(&self, mode: DictionaryMode, term: &str) -> Option<&str> {
        let terms = self.dictionaries.get(&mode)?;
        match terms.get(term) {
            Some(def) => Some(def.as_str()),
            None if term.bytes().any(|b| b.is_ascii_uppercase()) => terms
                .get(&term.to_ascii_lowercase())
                .map(String::as_str),
            None => None,
        }
    }

    pub fn contains(&self, mode: DictionaryMode, term: &str) -> bool {
        self.lookup(mode, term).is_some()
    }

    /// Number of terms in `mode`.
    pub fn term_count(&self, mode: DictionaryMode) -> usize {
        self.dictionaries.get(&mode).map_or(0, HashMap::len)
    }

    /// Terms of `mode` in lexical order.
    pub fn terms(&self, mode: DictionaryMode) -> Vec<&str> {
        let mut terms: Vec<&str> = self
            .dictionaries
            .get(&mode)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default();
        terms.sort_unstable();
        terms
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn load_tsv(path: PathBuf) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file = File::open(&path).with_context(|| format!("open term file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut terms = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((term, definition)) = trimmed.split_once('\t') else {
            bail!(
                "line {} in {}: expected `term<TAB>definition`",
                lineno + 1,
                path.display()
            );
        };
        let term = normalize_term(term);
        let definition = definition.trim();
        if term.is_empty() || definition.is_empty() {
            bail!(
                "line {} in {}: term and definition must be non-empty",
                lineno + 1,
                path.display()
            );
        }
        terms.insert(term, definition.to_string());
    }
    Ok(terms)
}

// Same shape as the pipeline's word normalization, so keys match lookups.
fn normalize_term(raw: &str) -> String {
    raw.to_lowercase()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}
