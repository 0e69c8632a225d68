//! Keyword Extractor: pulls weighted keywords out of a raw job description.
//!
//! Two passes, no LLM call:
//! 1. Vocabulary scan: every configured term, case-insensitive, whole-word. Where
//!    matches overlap, the longest one wins.
//! 2. Frequency pass: repeated words outside the vocabulary become `generic` keywords.
//!
//! Priority and requirement type come from trigger words in a ±50-char window around
//! each occurrence. Output is deduplicated by term, ordered category-then-discovery.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::vocabulary::{Triggers, Vocabulary};

/// Characters inspected on each side of an occurrence for trigger words.
pub const CONTEXT_RADIUS: usize = 50;

const MIN_GENERIC_CHARS: usize = 4;
const MIN_GENERIC_FREQUENCY: u32 = 2;
const MAX_GENERIC_TERMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Technical,
    Tool,
    Methodology,
    SoftSkill,
    Certification,
    Generic,
}

impl KeywordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordCategory::Technical => "technical",
            KeywordCategory::Tool => "tool",
            KeywordCategory::Methodology => "methodology",
            KeywordCategory::SoftSkill => "soft_skill",
            KeywordCategory::Certification => "certification",
            KeywordCategory::Generic => "generic",
        }
    }

    /// Priority when no trigger word is found near the keyword.
    pub fn default_priority(&self) -> Priority {
        match self {
            KeywordCategory::SoftSkill | KeywordCategory::Generic => Priority::Low,
            _ => Priority::Medium,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            KeywordCategory::Technical => 0,
            KeywordCategory::Tool => 1,
            KeywordCategory::Methodology => 2,
            KeywordCategory::SoftSkill => 3,
            KeywordCategory::Certification => 4,
            KeywordCategory::Generic => 5,
        }
    }
}

/// Ordered weakest to strongest so `max` picks the strongest signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Weight used by the keyword sub-score.
    pub fn weight(&self) -> u32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    NiceToHave,
    Preferred,
    Required,
}

/// A keyword found in a job posting. Recomputed on every analysis, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedKeyword {
    /// Lowercase canonical form; the dedup key.
    pub term: String,
    /// Surface form as first seen in the posting.
    pub display: String,
    pub category: KeywordCategory,
    pub priority: Priority,
    pub frequency: u32,
    pub requirement_type: RequirementType,
}

/// Strongest trigger signal seen across a keyword's occurrences.
#[derive(Debug, Clone, Copy, Default)]
struct ContextSignal {
    priority: Option<Priority>,
    requirement: Option<RequirementType>,
}

impl ContextSignal {
    fn classify(window: &str, triggers: &Triggers) -> Self {
        let hit = |set: &Option<Regex>| set.as_ref().is_some_and(|re| re.is_match(window));

        let critical = hit(&triggers.critical);
        let experience = hit(&triggers.experience);
        let preferred = hit(&triggers.preferred);

        let priority = if critical {
            Some(Priority::Critical)
        } else if experience {
            Some(Priority::High)
        } else if preferred {
            Some(Priority::Medium)
        } else {
            None
        };

        let requirement = if critical {
            Some(RequirementType::Required)
        } else if preferred {
            Some(RequirementType::Preferred)
        } else {
            None
        };

        Self {
            priority,
            requirement,
        }
    }

    fn absorb(&mut self, other: ContextSignal) {
        self.priority = self.priority.max(other.priority);
        self.requirement = self.requirement.max(other.requirement);
    }

    fn resolve(&self, category: KeywordCategory) -> (Priority, RequirementType) {
        let default = category.default_priority();
        let priority = self.priority.map(|p| p.max(default)).unwrap_or(default);
        let requirement = self.requirement.unwrap_or(RequirementType::NiceToHave);
        (priority, requirement)
    }
}

/// Extracts keywords from posting text. Empty or whitespace-only input yields `[]`.
pub fn extract_keywords(text: &str, vocabulary: &Vocabulary) -> Vec<ExtractedKeyword> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let triggers = vocabulary.triggers();

    // Pass 1: vocabulary scan. Overlapping matches resolve to the longest one, so a
    // nested shorter term ("scrum" inside "certified scrum master") is not counted.
    let mut occurrences: Vec<(usize, Range<usize>)> = Vec::new();
    for (index, vocab_term) in vocabulary.terms().iter().enumerate() {
        occurrences.extend(vocab_term.pattern.find_iter(text).map(|m| (index, m.range())));
    }
    occurrences.sort_by_key(|(index, span)| (Reverse(span.len()), span.start, *index));

    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut spans_by_term: HashMap<usize, Vec<Range<usize>>> = HashMap::new();
    for (index, span) in occurrences {
        if claimed.iter().any(|c| overlaps(c, &span)) {
            continue;
        }
        claimed.push(span.clone());
        spans_by_term.entry(index).or_default().push(span);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut hits: Vec<(u8, usize, ExtractedKeyword)> = Vec::new();
    for (index, vocab_term) in vocabulary.terms().iter().enumerate() {
        let Some(mut spans) = spans_by_term.remove(&index) else {
            continue;
        };
        if !seen.insert(vocab_term.term.clone()) {
            continue;
        }
        spans.sort_by_key(|span| span.start);

        let mut signal = ContextSignal::default();
        for span in &spans {
            let window = context_window(text, span.start, span.end, CONTEXT_RADIUS);
            signal.absorb(ContextSignal::classify(window, triggers));
        }

        let first = &spans[0];
        let (priority, requirement_type) = signal.resolve(vocab_term.category);
        hits.push((
            vocab_term.category.rank(),
            first.start,
            ExtractedKeyword {
                term: vocab_term.term.clone(),
                display: text[first.clone()]
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
                category: vocab_term.category,
                priority,
                frequency: u32::try_from(spans.len()).unwrap_or(u32::MAX),
                requirement_type,
            },
        ));
    }
    hits.sort_by_key(|(rank, offset, _)| (*rank, *offset));

    let mut keywords: Vec<ExtractedKeyword> = hits.into_iter().map(|(_, _, kw)| kw).collect();

    // Pass 2: frequency-based generic terms
    keywords.extend(extract_generic_terms(text, vocabulary, &seen, &claimed));

    keywords
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

struct GenericTally {
    first: usize,
    frequency: u32,
    signal: ContextSignal,
}

/// Tokens inside a vocabulary match, or that are aliases of an extracted term, are
/// never counted here.
fn extract_generic_terms(
    text: &str,
    vocabulary: &Vocabulary,
    already_extracted: &HashSet<String>,
    claimed: &[Range<usize>],
) -> Vec<ExtractedKeyword> {
    let triggers = vocabulary.triggers();

    let mut tallies: HashMap<String, GenericTally> = HashMap::new();
    for m in token_pattern().find_iter(text) {
        let span = m.range();
        if claimed.iter().any(|c| overlaps(c, &span)) {
            continue;
        }
        let token = m.as_str().to_lowercase();
        if token.chars().count() < MIN_GENERIC_CHARS
            || vocabulary.is_stop_word(&token)
            || already_extracted.contains(vocabulary.canonical(&token))
        {
            continue;
        }

        let window = context_window(text, span.start, span.end, CONTEXT_RADIUS);
        let signal = ContextSignal::classify(window, triggers);
        let tally = tallies.entry(token).or_insert_with(|| GenericTally {
            first: span.start,
            frequency: 0,
            signal: ContextSignal::default(),
        });
        tally.frequency += 1;
        tally.signal.absorb(signal);
    }

    let mut candidates: Vec<(String, GenericTally)> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.frequency >= MIN_GENERIC_FREQUENCY)
        .collect();

    // Most frequent first, earliest wins ties; then back to discovery order
    candidates.sort_by_key(|(_, tally)| (Reverse(tally.frequency), tally.first));
    candidates.truncate(MAX_GENERIC_TERMS);
    candidates.sort_by_key(|(_, tally)| tally.first);

    candidates
        .into_iter()
        .map(|(token, tally)| {
            let (priority, requirement_type) = tally.signal.resolve(KeywordCategory::Generic);
            ExtractedKeyword {
                display: token.clone(),
                term: token,
                category: KeywordCategory::Generic,
                priority,
                frequency: tally.frequency,
                requirement_type,
            }
        })
        .collect()
}

/// Word tokens of at least 3 chars that start with a letter.
fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\b\p{L}[\p{L}\p{N}]{2,}\b").expect("token pattern is valid"))
}

/// Slice of `text` covering up to `radius` chars before `start` and after `end`.
/// Always cut on char boundaries.
pub fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let hi = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    &text[lo..hi]
}
