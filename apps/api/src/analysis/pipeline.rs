//! Analysis pipeline: Keyword Extractor → Skill Matcher → Score Calculator →
//! Content Generator.
//!
//! Every stage runs over data owned by the request. The remote fallback in the
//! score stage is the only await point and the only source of non-determinism.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::content::{generate_content, ContentRequest, GeneratedResumeContent};
use crate::analysis::extractor::{extract_keywords, ExtractedKeyword, Priority, RequirementType};
use crate::analysis::matcher::{match_skills, MatchMode, SkillMatch, TermMatcher};
use crate::analysis::scoring::{
    build_recommendations, calculate_score, RemoteScorer, ScoreBasis, ScoreBreakdown, ScoreInput,
};
use crate::analysis::vocabulary::Vocabulary;
use crate::models::posting::JobPosting;
use crate::models::profile::UserProfile;

/// The user-facing comparison between one posting and one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Keywords the posting marks as required or ranks high or critical.
    pub key_requirements: Vec<String>,
    pub match_score: u32,
    pub recommendations: Vec<String>,
    /// Critical keywords the profile does not cover.
    pub critical_areas: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub generation: u64,
    pub posting: JobPosting,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub generation: u64,
    pub keywords: Vec<ExtractedKeyword>,
    pub match_result: MatchResult,
    pub score_breakdown: ScoreBreakdown,
    pub score_basis: ScoreBasis,
    pub content: GeneratedResumeContent,
}

#[derive(Clone)]
pub struct AnalysisPipeline {
    vocabulary: Arc<Vocabulary>,
    mode: MatchMode,
    remote: Option<Arc<dyn RemoteScorer>>,
}

impl AnalysisPipeline {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        mode: MatchMode,
        remote: Option<Arc<dyn RemoteScorer>>,
    ) -> Self {
        Self {
            vocabulary,
            mode,
            remote,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn extract(&self, description: &str) -> Vec<ExtractedKeyword> {
        extract_keywords(description, &self.vocabulary)
    }

    pub async fn run(&self, request: AnalysisRequest) -> AnalysisOutcome {
        let AnalysisRequest {
            generation,
            posting,
            profile,
        } = request;
        let matcher = TermMatcher::new(self.mode, &self.vocabulary);

        let keywords = self.extract(&posting.description);
        debug!("Extracted {} keywords", keywords.len());

        let skill_match = match_skills(&keywords, &profile, &matcher);
        debug!(
            "Matched {}/{} keywords ({} critical missing)",
            skill_match.matched.len(),
            skill_match.total_keywords(),
            skill_match.critical_missing.len()
        );

        let report = calculate_score(
            ScoreInput {
                skill_match: &skill_match,
                profile: &profile,
                job_description: &posting.description,
                matcher: &matcher,
            },
            self.remote.as_deref(),
        )
        .await;

        let content = generate_content(ContentRequest {
            posting: &posting,
            profile: &profile,
            skill_match: &skill_match,
            matcher: &matcher,
        });

        let match_result = build_match_result(&keywords, &skill_match, report.overall, &profile);

        info!(
            "Analysis for user {} complete: score={} basis={:?} generation={}",
            profile.user_id, match_result.match_score, report.basis, generation
        );

        AnalysisOutcome {
            generation,
            keywords,
            match_result,
            score_breakdown: report.breakdown,
            score_basis: report.basis,
            content,
        }
    }

    /// Rebuilds résumé content from previously extracted keywords and a (possibly
    /// updated) profile. No scoring, no remote calls.
    pub fn regenerate_content(
        &self,
        posting: &JobPosting,
        keywords: &[ExtractedKeyword],
        profile: &UserProfile,
    ) -> GeneratedResumeContent {
        let matcher = TermMatcher::new(self.mode, &self.vocabulary);
        let skill_match = match_skills(keywords, profile, &matcher);
        generate_content(ContentRequest {
            posting,
            profile,
            skill_match: &skill_match,
            matcher: &matcher,
        })
    }
}

fn build_match_result(
    keywords: &[ExtractedKeyword],
    skill_match: &SkillMatch,
    score: u32,
    profile: &UserProfile,
) -> MatchResult {
    let key_requirements = keywords
        .iter()
        .filter(|k| k.requirement_type == RequirementType::Required || k.priority >= Priority::High)
        .map(|k| k.term.clone())
        .collect();

    MatchResult {
        matched_skills: skill_match.matched_terms(),
        missing_skills: skill_match.missing_terms(),
        key_requirements,
        match_score: score,
        recommendations: build_recommendations(score, skill_match, profile),
        critical_areas: skill_match.critical_missing.clone(),
    }
}
