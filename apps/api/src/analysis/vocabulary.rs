//! Vocabulary: versioned keyword lists, priority triggers, stop words and synonyms.
//!
//! Loaded once at startup from JSON (`VOCABULARY_PATH`, or the built-in file) and held
//! behind an `Arc` in `AppState`. Every term is compiled to a boundary-aware regex here
//! so the extractor never compiles patterns per request.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::analysis::extractor::KeywordCategory;

/// Vocabulary shipped with the binary.
pub const DEFAULT_VOCABULARY: &str = include_str!("../../config/vocabulary.json");

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Failed to read vocabulary file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Vocabulary JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid vocabulary: {0}")]
    Invalid(String),

    #[error("Failed to compile pattern for '{term}': {source}")]
    Pattern {
        term: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    version: String,
    categories: CategoryLists,
    triggers: TriggerLists,
    #[serde(default)]
    stop_words: Vec<String>,
    #[serde(default)]
    synonyms: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryLists {
    technical: Vec<String>,
    tool: Vec<String>,
    methodology: Vec<String>,
    soft_skill: Vec<String>,
    certification: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TriggerLists {
    critical: Vec<String>,
    experience: Vec<String>,
    preferred: Vec<String>,
}

/// Context words that promote a keyword's priority / requirement type, compiled as
/// whole-word patterns. `None` when the list is empty.
#[derive(Debug, Clone, Default)]
pub struct Triggers {
    pub critical: Option<Regex>,
    pub experience: Option<Regex>,
    pub preferred: Option<Regex>,
}

impl Triggers {
    fn compile(lists: &TriggerLists) -> Result<Self, VocabularyError> {
        Ok(Self {
            critical: trigger_pattern("critical", &lists.critical)?,
            experience: trigger_pattern("experience", &lists.experience)?,
            preferred: trigger_pattern("preferred", &lists.preferred)?,
        })
    }
}

fn trigger_pattern(set: &str, words: &[String]) -> Result<Option<Regex>, VocabularyError> {
    let words = normalize_list(words);
    if words.is_empty() {
        return Ok(None);
    }
    let variants: Vec<&str> = words.iter().map(String::as_str).collect();
    term_pattern(&variants)
        .map(Some)
        .map_err(|source| VocabularyError::Pattern {
            term: format!("{set} triggers"),
            source,
        })
}

/// A single vocabulary term with its compiled pattern (canonical form plus aliases).
#[derive(Debug, Clone)]
pub struct VocabularyTerm {
    pub term: String,
    pub category: KeywordCategory,
    pub pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    version: String,
    terms: Vec<VocabularyTerm>,
    triggers: Triggers,
    stop_words: HashSet<String>,
    /// alias → canonical
    synonyms: HashMap<String, String>,
    /// canonical → aliases
    aliases: HashMap<String, Vec<String>>,
}

impl Vocabulary {
    /// Parses the embedded default vocabulary.
    pub fn builtin() -> Result<Self, VocabularyError> {
        Self::from_json(DEFAULT_VOCABULARY)
    }

    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = serde_json::from_str(raw)?;

        let version = file.version.trim().to_string();
        if version.is_empty() {
            return Err(VocabularyError::Invalid("version must not be empty".to_string()));
        }

        let mut synonyms = HashMap::new();
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        for (alias, canonical) in &file.synonyms {
            let alias = normalize_term(alias);
            let canonical = normalize_term(canonical);
            if alias.is_empty() || canonical.is_empty() {
                return Err(VocabularyError::Invalid(
                    "synonym entries must not be empty".to_string(),
                ));
            }
            if alias == canonical {
                continue;
            }
            aliases.entry(canonical.clone()).or_default().push(alias.clone());
            synonyms.insert(alias, canonical);
        }

        let lists = [
            (KeywordCategory::Technical, &file.categories.technical),
            (KeywordCategory::Tool, &file.categories.tool),
            (KeywordCategory::Methodology, &file.categories.methodology),
            (KeywordCategory::SoftSkill, &file.categories.soft_skill),
            (KeywordCategory::Certification, &file.categories.certification),
        ];

        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for (category, list) in lists {
            for raw_term in list {
                let term = normalize_term(raw_term);
                if term.is_empty() {
                    return Err(VocabularyError::Invalid(format!(
                        "empty term in category {}",
                        category.as_str()
                    )));
                }
                if !seen.insert(term.clone()) {
                    debug!("Vocabulary term '{term}' listed twice; keeping first category");
                    continue;
                }

                let mut variants = vec![term.as_str()];
                if let Some(alias_list) = aliases.get(&term) {
                    variants.extend(alias_list.iter().map(String::as_str));
                }
                let pattern =
                    term_pattern(&variants).map_err(|source| VocabularyError::Pattern {
                        term: term.clone(),
                        source,
                    })?;

                terms.push(VocabularyTerm {
                    term,
                    category,
                    pattern,
                });
            }
        }

        let triggers = Triggers::compile(&file.triggers)?;

        let stop_words = normalize_list(&file.stop_words).into_iter().collect();

        Ok(Self {
            version,
            terms,
            triggers,
            stop_words,
            synonyms,
            aliases,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Terms in category order (technical, tool, methodology, soft skill, certification).
    pub fn terms(&self) -> &[VocabularyTerm] {
        &self.terms
    }

    pub fn triggers(&self) -> &Triggers {
        &self.triggers
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Canonical form for an already-normalized term; the term itself if it has no synonym.
    pub fn canonical<'a>(&'a self, term: &'a str) -> &'a str {
        self.synonyms.get(term).map(String::as_str).unwrap_or(term)
    }

    pub fn aliases_of(&self, canonical: &str) -> &[String] {
        self.aliases.get(canonical).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Trims, lowercases and collapses inner whitespace.
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_list(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|t| normalize_term(t))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Builds a case-insensitive pattern matching any of `variants` as whole words.
///
/// A `\b` anchor is only placed on an edge whose character is a word character, so
/// terms like `c++`, `c#` or `.net` still match. Inner spaces match any whitespace run.
/// Longer variants are tried first.
pub fn term_pattern(variants: &[&str]) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&str> = variants.iter().copied().filter(|v| !v.is_empty()).collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));

    let alternatives: Vec<String> = sorted
        .into_iter()
        .map(|variant| {
            let body = variant
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let prefix = if variant.chars().next().is_some_and(is_word_char) {
                r"\b"
            } else {
                ""
            };
            let suffix = if variant.chars().last().is_some_and(is_word_char) {
                r"\b"
            } else {
                ""
            };
            format!("{prefix}{body}{suffix}")
        })
        .collect();

    Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
