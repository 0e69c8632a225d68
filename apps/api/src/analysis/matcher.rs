//! Skill Matcher: partitions extracted keywords into matched / missing for a profile.
//!
//! Sources are checked in order: skill list, work history, education, certifications.
//! The first source that contains a keyword wins and is recorded as evidence.
//!
//! Two matching modes:
//! - `Token` (default): synonym-aware, word-boundary containment. "java" ≠ "javascript".
//! - `Substring`: bidirectional case-insensitive containment, kept for parity with
//!   older analyses. Loose by construction ("java" matches "javascript").

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::extractor::{ExtractedKeyword, Priority};
use crate::analysis::vocabulary::{is_word_char, normalize_term, Vocabulary};
use crate::models::profile::{UserProfile, WorkExperienceEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Token,
    Substring,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "token" => Ok(MatchMode::Token),
            "substring" => Ok(MatchMode::Substring),
            other => Err(format!(
                "unknown match mode '{other}' (expected 'token' or 'substring')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Skill,
    WorkHistory,
    Education,
    Certification,
}

impl MatchSource {
    pub fn label(&self) -> &'static str {
        match self {
            MatchSource::Skill => "skills",
            MatchSource::WorkHistory => "work history",
            MatchSource::Education => "education",
            MatchSource::Certification => "certifications",
        }
    }
}

/// A keyword covered by the profile, with where it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMatch {
    pub keyword: ExtractedKeyword,
    pub source: MatchSource,
    /// The matching skill entry as the user wrote it, or the section label.
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub matched: Vec<KeywordMatch>,
    pub missing: Vec<ExtractedKeyword>,
    /// Terms of missing keywords with `critical` priority.
    pub critical_missing: Vec<String>,
}

impl SkillMatch {
    pub fn matched_terms(&self) -> Vec<String> {
        self.matched.iter().map(|m| m.keyword.term.clone()).collect()
    }

    pub fn missing_terms(&self) -> Vec<String> {
        self.missing.iter().map(|k| k.term.clone()).collect()
    }

    pub fn total_keywords(&self) -> usize {
        self.matched.len() + self.missing.len()
    }
}

/// Term-level matching primitives for one mode. All inputs must be normalized
/// (see `normalize_term`).
pub struct TermMatcher<'v> {
    mode: MatchMode,
    vocabulary: &'v Vocabulary,
}

impl<'v> TermMatcher<'v> {
    pub fn new(mode: MatchMode, vocabulary: &'v Vocabulary) -> Self {
        Self { mode, vocabulary }
    }

    /// Occurrences of `term` in `haystack`. In token mode aliases count too; the best
    /// variant's count is returned so overlapping aliases are not double counted.
    pub fn count_in(&self, haystack: &str, term: &str) -> usize {
        if term.is_empty() {
            return 0;
        }
        match self.mode {
            MatchMode::Substring => haystack.matches(term).count(),
            MatchMode::Token => std::iter::once(term)
                .chain(self.vocabulary.aliases_of(term).iter().map(String::as_str))
                .map(|variant| count_on_boundary(haystack, variant))
                .max()
                .unwrap_or(0),
        }
    }

    pub fn contains(&self, haystack: &str, term: &str) -> bool {
        self.count_in(haystack, term) > 0
    }

    /// Whether a single skill-list entry covers `term`.
    pub fn skill_matches(&self, skill: &str, term: &str) -> bool {
        if skill.is_empty() || term.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Substring => skill.contains(term) || term.contains(skill),
            MatchMode::Token => {
                self.vocabulary.canonical(skill) == self.vocabulary.canonical(term)
                    || self.contains(skill, term)
                    || count_on_boundary(term, skill) > 0
            }
        }
    }
}

/// Matches extracted keywords against a profile. Never fails.
pub fn match_skills(
    keywords: &[ExtractedKeyword],
    profile: &UserProfile,
    matcher: &TermMatcher<'_>,
) -> SkillMatch {
    let skills: Vec<(&str, String)> = profile
        .skills
        .iter()
        .map(|s| (s.trim(), normalize_term(s)))
        .filter(|(_, normalized)| !normalized.is_empty())
        .collect();

    let text_sources = [
        (
            MatchSource::WorkHistory,
            normalize_term(&profile.work_history_text()),
        ),
        (MatchSource::Education, normalize_term(&profile.education_text())),
        (
            MatchSource::Certification,
            normalize_term(&profile.certification_text()),
        ),
    ];

    let mut result = SkillMatch::default();

    for keyword in keywords {
        let term = normalize_term(&keyword.term);

        if let Some((original, _)) = skills
            .iter()
            .find(|(_, normalized)| matcher.skill_matches(normalized, &term))
        {
            result.matched.push(KeywordMatch {
                keyword: keyword.clone(),
                source: MatchSource::Skill,
                evidence: original.to_string(),
            });
            continue;
        }

        if let Some((source, _)) = text_sources
            .iter()
            .find(|(_, text)| matcher.contains(text, &term))
        {
            result.matched.push(KeywordMatch {
                keyword: keyword.clone(),
                source: *source,
                evidence: source.label().to_string(),
            });
            continue;
        }

        if keyword.priority == Priority::Critical {
            result.critical_missing.push(keyword.term.clone());
        }
        result.missing.push(keyword.clone());
    }

    result
}

/// Weighted keyword overlap between an experience entry and matched terms.
/// Title hits count double body hits.
pub fn entry_relevance(
    entry: &WorkExperienceEntry,
    matched_terms: &[String],
    matcher: &TermMatcher<'_>,
) -> f32 {
    const TITLE_WEIGHT: f32 = 2.0;
    const BODY_WEIGHT: f32 = 1.0;

    let title = normalize_term(&entry.title);
    let body = normalize_term(&entry.body_text());

    matched_terms
        .iter()
        .map(|term| {
            let term = normalize_term(term);
            TITLE_WEIGHT * matcher.count_in(&title, &term) as f32
                + BODY_WEIGHT * matcher.count_in(&body, &term) as f32
        })
        .sum()
}

/// Counts non-overlapping occurrences of `needle` that sit on word boundaries.
/// A boundary is only required on an edge of `needle` that is a word character.
fn count_on_boundary(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let needs_start = needle.chars().next().is_some_and(is_word_char);
    let needs_end = needle.chars().last().is_some_and(is_word_char);

    haystack
        .match_indices(needle)
        .filter(|(i, _)| {
            let before_ok = !needs_start
                || haystack[..*i]
                    .chars()
                    .next_back()
                    .map_or(true, |c| !is_word_char(c));
            let after_ok = !needs_end
                || haystack[*i + needle.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !is_word_char(c));
            before_ok && after_ok
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extractor::{extract_keywords, KeywordCategory, RequirementType};
    use crate::models::profile::{CertificationEntry, EducationEntry};
    use std::collections::HashSet;

    fn vocab() -> Vocabulary {
        Vocabulary::builtin().unwrap()
    }

    fn make_keyword(term: &str, priority: Priority) -> ExtractedKeyword {
        ExtractedKeyword {
            term: term.to_string(),
            display: term.to_string(),
            category: KeywordCategory::Technical,
            priority,
            frequency: 1,
            requirement_type: RequirementType::NiceToHave,
        }
    }

    fn profile_with_skills(skills: &[&str]) -> UserProfile {
        UserProfile {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_python_aws_scenario() {
        let v = vocab();
        let keywords = extract_keywords("Requires Python and AWS experience, 5+ years", &v);
        let profile = profile_with_skills(&["Python"]);
        let result = match_skills(&keywords, &profile, &TermMatcher::new(MatchMode::Token, &v));

        assert_eq!(result.matched_terms(), vec!["python"]);
        assert!(result.missing_terms().contains(&"aws".to_string()));
        assert_eq!(result.critical_missing, vec!["aws"]);
        assert_eq!(result.matched[0].evidence, "Python");
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let v = vocab();
        let text = "Python, Java, Docker, Kubernetes and Terraform required. Scrum preferred. \
                    Ledger ledger reconciliation reconciliation.";
        let keywords = extract_keywords(text, &v);
        let profile = UserProfile {
            skills: vec!["python".to_string(), "K8s".to_string()],
            work_experience: vec![WorkExperienceEntry {
                title: "Engineer".to_string(),
                description: "Ran scrum ceremonies and ledger reconciliation".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        for mode in [MatchMode::Token, MatchMode::Substring] {
            let result = match_skills(&keywords, &profile, &TermMatcher::new(mode, &v));
            let matched: HashSet<_> = result.matched_terms().into_iter().collect();
            let missing: HashSet<_> = result.missing_terms().into_iter().collect();
            let all: HashSet<_> = keywords.iter().map(|k| k.term.clone()).collect();

            assert!(matched.is_disjoint(&missing), "{mode:?}");
            assert_eq!(&matched | &missing, all, "{mode:?}");
        }
    }

    #[test]
    fn test_token_mode_does_not_match_java_to_javascript() {
        let v = vocab();
        let matcher = TermMatcher::new(MatchMode::Token, &v);
        let result = match_skills(
            &[make_keyword("java", Priority::High)],
            &profile_with_skills(&["JavaScript"]),
            &matcher,
        );
        assert!(result.matched.is_empty());
        assert_eq!(result.missing_terms(), vec!["java"]);
    }

    #[test]
    fn test_substring_mode_matches_java_to_javascript() {
        let v = vocab();
        let matcher = TermMatcher::new(MatchMode::Substring, &v);
        let result = match_skills(
            &[make_keyword("java", Priority::High)],
            &profile_with_skills(&["JavaScript"]),
            &matcher,
        );
        assert_eq!(result.matched_terms(), vec!["java"]);
    }

    #[test]
    fn test_substring_mode_is_bidirectional() {
        let v = vocab();
        let matcher = TermMatcher::new(MatchMode::Substring, &v);
        // entry is a substring of the keyword
        assert!(matcher.skill_matches("react", "react native"));
        // keyword is a substring of the entry
        assert!(matcher.skill_matches("aws lambda", "aws"));
        assert!(!matcher.skill_matches("", "aws"));
    }

    #[test]
    fn test_token_mode_uses_synonyms() {
        let v = vocab();
        let matcher = TermMatcher::new(MatchMode::Token, &v);
        assert!(matcher.skill_matches("k8s", "kubernetes"));
        assert!(matcher.skill_matches("postgres", "postgresql"));
        assert!(matcher.skill_matches("amazon web services (aws)", "aws"));
        assert!(!matcher.skill_matches("awsome", "aws"));
    }

    #[test]
    fn test_work_history_is_secondary_source() {
        let v = vocab();
        let profile = UserProfile {
            work_experience: vec![WorkExperienceEntry {
                title: "Platform Engineer".to_string(),
                company: "Acme".to_string(),
                achievements: vec!["Migrated services to Kubernetes".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let result = match_skills(
            &[make_keyword("kubernetes", Priority::Medium)],
            &profile,
            &TermMatcher::new(MatchMode::Token, &v),
        );
        assert_eq!(result.matched[0].source, MatchSource::WorkHistory);
        assert_eq!(result.matched[0].evidence, "work history");
    }

    #[test]
    fn test_education_and_certification_sources() {
        let v = vocab();
        let profile = UserProfile {
            education: vec![EducationEntry {
                institution: "State University".to_string(),
                degree: "MSc".to_string(),
                field_of_study: Some("Machine Learning".to_string()),
                ..Default::default()
            }],
            certifications: vec![CertificationEntry {
                name: "PMP".to_string(),
                issuer: Some("PMI".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let result = match_skills(
            &[
                make_keyword("machine learning", Priority::Medium),
                make_keyword("pmp", Priority::Medium),
            ],
            &profile,
            &TermMatcher::new(MatchMode::Token, &v),
        );
        assert_eq!(result.matched[0].source, MatchSource::Education);
        assert_eq!(result.matched[1].source, MatchSource::Certification);
    }

    #[test]
    fn test_skill_list_takes_precedence_over_text() {
        let v = vocab();
        let profile = UserProfile {
            skills: vec!["Docker".to_string()],
            work_experience: vec![WorkExperienceEntry {
                description: "Docker everywhere".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let result = match_skills(
            &[make_keyword("docker", Priority::Medium)],
            &profile,
            &TermMatcher::new(MatchMode::Token, &v),
        );
        assert_eq!(result.matched[0].source, MatchSource::Skill);
    }

    #[test]
    fn test_only_critical_missing_is_surfaced() {
        let v = vocab();
        let result = match_skills(
            &[
                make_keyword("rust", Priority::Critical),
                make_keyword("kafka", Priority::High),
            ],
            &UserProfile::default(),
            &TermMatcher::new(MatchMode::Token, &v),
        );
        assert_eq!(result.critical_missing, vec!["rust"]);
        assert_eq!(result.missing.len(), 2);
    }

    #[test]
    fn test_empty_keywords_yield_empty_partition() {
        let v = vocab();
        let result = match_skills(
            &[],
            &profile_with_skills(&["Python"]),
            &TermMatcher::new(MatchMode::Token, &v),
        );
        assert_eq!(result, SkillMatch::default());
        assert_eq!(result.total_keywords(), 0);
    }

    #[test]
    fn test_entry_relevance_weights_title_over_body() {
        let v = vocab();
        let matcher = TermMatcher::new(MatchMode::Token, &v);
        let titled = WorkExperienceEntry {
            title: "Python Developer".to_string(),
            ..Default::default()
        };
        let body_only = WorkExperienceEntry {
            title: "Developer".to_string(),
            description: "Wrote Python".to_string(),
            ..Default::default()
        };
        let terms = vec!["python".to_string()];
        assert_eq!(entry_relevance(&titled, &terms, &matcher), 2.0);
        assert_eq!(entry_relevance(&body_only, &terms, &matcher), 1.0);
    }

    #[test]
    fn test_count_on_boundary_symbol_terms() {
        assert_eq!(count_on_boundary("c++ and c++17", "c++"), 2);
        assert_eq!(count_on_boundary("ci/cd pipelines", "ci/cd"), 1);
        assert_eq!(count_on_boundary("javascript", "java"), 0);
    }

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("Token".parse::<MatchMode>().unwrap(), MatchMode::Token);
        assert_eq!(" substring ".parse::<MatchMode>().unwrap(), MatchMode::Substring);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }
}
