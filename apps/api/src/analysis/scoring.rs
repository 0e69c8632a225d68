//! Score Calculator: turns a skill match plus profile signals into a 0–100 score.
//!
//! With at least one match the score is the keyword ratio scaled to 85 plus section
//! bonuses, capped at 95. With no matches it asks the optional `RemoteScorer` (capped
//! at 50) and falls back to a content-length heuristic when that is absent or fails.
//!
//! The four-way breakdown is computed independently; `composite` is its weighted
//! average (40/30/20/10) and does not feed back into `overall`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::extractor::Priority;
use crate::analysis::matcher::{entry_relevance, SkillMatch, TermMatcher};
use crate::models::profile::UserProfile;
use crate::scoring_client::{
    RemoteScoreRequest, RemoteScoreResponse, ScoringClient, ScoringClientError,
};

pub const KEYWORD_RATIO_CEILING: f64 = 85.0;
pub const WORK_EXPERIENCE_BONUS: u32 = 5;
pub const EDUCATION_BONUS: u32 = 3;
pub const CERTIFICATION_BONUS: u32 = 2;
pub const MAX_MATCH_SCORE: u32 = 95;
pub const REMOTE_ESTIMATE_CAP: u32 = 50;
pub const RICH_HISTORY_SCORE: u32 = 25;
pub const SPARSE_HISTORY_SCORE: u32 = 15;
const RICH_HISTORY_CHARS: usize = 200;

const REMOTE_MODE: &str = "match";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBasis {
    KeywordRatio,
    RemoteEstimate,
    ContentHeuristic,
}

/// Category sub-scores, each 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub keyword: u32,
    pub content: u32,
    pub structure: u32,
    pub experience: u32,
    /// 40% keyword, 30% content, 20% structure, 10% experience.
    pub composite: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub overall: u32,
    pub breakdown: ScoreBreakdown,
    pub basis: ScoreBasis,
}

/// Best-effort remote estimate used when no keyword matched.
///
/// Carried in `AppState` as `Option<Arc<dyn RemoteScorer>>`.
#[async_trait]
pub trait RemoteScorer: Send + Sync {
    async fn estimate(
        &self,
        request: &RemoteScoreRequest,
    ) -> Result<RemoteScoreResponse, ScoringClientError>;
}

#[async_trait]
impl RemoteScorer for ScoringClient {
    async fn estimate(
        &self,
        request: &RemoteScoreRequest,
    ) -> Result<RemoteScoreResponse, ScoringClientError> {
        self.score(request).await
    }
}

pub struct ScoreInput<'a> {
    pub skill_match: &'a SkillMatch,
    pub profile: &'a UserProfile,
    pub job_description: &'a str,
    pub matcher: &'a TermMatcher<'a>,
}

pub async fn calculate_score(
    input: ScoreInput<'_>,
    remote: Option<&dyn RemoteScorer>,
) -> ScoreReport {
    let breakdown = compute_breakdown(&input);
    let matches = input.skill_match.matched.len();
    let total = input.skill_match.total_keywords();

    let (overall, basis) = if matches > 0 {
        (
            keyword_ratio_score(matches, total, input.profile),
            ScoreBasis::KeywordRatio,
        )
    } else if total == 0 {
        debug!("No keywords extracted; using content heuristic");
        (content_heuristic_score(input.profile), ScoreBasis::ContentHeuristic)
    } else {
        zero_match_score(&input, remote).await
    };

    ScoreReport {
        overall,
        breakdown,
        basis,
    }
}

/// `round(matches / total * 85)` plus section bonuses, capped at 95.
pub fn keyword_ratio_score(matches: usize, total: usize, profile: &UserProfile) -> u32 {
    if matches == 0 || total == 0 {
        return 0;
    }
    let ratio = matches.min(total) as f64 / total as f64;
    let mut score = (ratio * KEYWORD_RATIO_CEILING).round() as u32;
    if profile.has_work_experience() {
        score += WORK_EXPERIENCE_BONUS;
    }
    if profile.has_education() {
        score += EDUCATION_BONUS;
    }
    if profile.has_certifications() {
        score += CERTIFICATION_BONUS;
    }
    score.min(MAX_MATCH_SCORE)
}

/// 25 when the work history carries more than 200 chars of text, else 15.
pub fn content_heuristic_score(profile: &UserProfile) -> u32 {
    if profile.work_history_text().chars().count() > RICH_HISTORY_CHARS {
        RICH_HISTORY_SCORE
    } else {
        SPARSE_HISTORY_SCORE
    }
}

async fn zero_match_score(
    input: &ScoreInput<'_>,
    remote: Option<&dyn RemoteScorer>,
) -> (u32, ScoreBasis) {
    let Some(remote) = remote else {
        return (
            content_heuristic_score(input.profile),
            ScoreBasis::ContentHeuristic,
        );
    };

    let request = RemoteScoreRequest {
        job_description: input.job_description.to_string(),
        resume_content: input.profile.resume_text(),
        mode: Some(REMOTE_MODE.to_string()),
    };

    match remote.estimate(&request).await {
        Ok(response)
            if response.overall_score.is_finite()
                && (0.0..=100.0).contains(&response.overall_score) =>
        {
            let score = (response.overall_score.round() as u32).min(REMOTE_ESTIMATE_CAP);
            debug!("Remote estimate {} capped to {score}", response.overall_score);
            (score, ScoreBasis::RemoteEstimate)
        }
        Ok(response) => {
            warn!(
                "Remote scorer returned out-of-range score {}; using content heuristic",
                response.overall_score
            );
            (
                content_heuristic_score(input.profile),
                ScoreBasis::ContentHeuristic,
            )
        }
        Err(e) => {
            warn!("Remote scoring failed, using content heuristic: {e}");
            (
                content_heuristic_score(input.profile),
                ScoreBasis::ContentHeuristic,
            )
        }
    }
}

fn compute_breakdown(input: &ScoreInput<'_>) -> ScoreBreakdown {
    let keyword = keyword_subscore(input.skill_match);
    let content = content_subscore(input.profile);
    let structure = structure_subscore(input.profile);
    let experience = experience_subscore(input.profile, input.skill_match, input.matcher);
    let composite = (0.4 * keyword as f64
        + 0.3 * content as f64
        + 0.2 * structure as f64
        + 0.1 * experience as f64)
        .round() as u32;

    ScoreBreakdown {
        keyword,
        content,
        structure,
        experience,
        composite,
    }
}

/// Priority-weighted keyword coverage.
fn keyword_subscore(skill_match: &SkillMatch) -> u32 {
    let matched: u32 = skill_match
        .matched
        .iter()
        .map(|m| m.keyword.priority.weight())
        .sum();
    let missing: u32 = skill_match.missing.iter().map(|k| k.priority.weight()).sum();
    let total = matched + missing;
    if total == 0 {
        return 0;
    }
    ((matched as f64 / total as f64) * 100.0).round() as u32
}

fn content_subscore(profile: &UserProfile) -> u32 {
    let mut score: u32 = 0;

    if profile
        .personal_info
        .summary
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty())
    {
        score += 25;
    }

    score += match profile.work_history_text().chars().count() {
        n if n >= 600 => 30,
        n if n > RICH_HISTORY_CHARS => 20,
        n if n > 0 => 10,
        _ => 0,
    };

    let quantified = profile
        .work_experience
        .iter()
        .any(|e| e.body_text().chars().any(|c| c.is_ascii_digit()));
    if quantified {
        score += 25;
    }

    score += match profile.skills.iter().filter(|s| !s.trim().is_empty()).count() {
        n if n >= 8 => 20,
        n if n >= 4 => 12,
        n if n >= 1 => 5,
        _ => 0,
    };

    score.min(100)
}

fn structure_subscore(profile: &UserProfile) -> u32 {
    let sections: [(bool, u32); 5] = [
        (profile.personal_info.has_contact(), 20),
        (profile.has_work_experience(), 30),
        (profile.has_education(), 20),
        (profile.skills.iter().any(|s| !s.trim().is_empty()), 20),
        (profile.has_certifications(), 10),
    ];
    sections
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, points)| points)
        .sum()
}

/// Share of experience entries touching a matched keyword (up to 80) plus depth (up to 20).
fn experience_subscore(
    profile: &UserProfile,
    skill_match: &SkillMatch,
    matcher: &TermMatcher<'_>,
) -> u32 {
    let entries = &profile.work_experience;
    if entries.is_empty() {
        return 0;
    }
    let terms = skill_match.matched_terms();
    let relevant = entries
        .iter()
        .filter(|e| entry_relevance(e, &terms, matcher) > 0.0)
        .count();
    let ratio = relevant as f64 / entries.len() as f64;
    let depth = entries.len().min(4) as u32 * 5;
    ((ratio * 80.0).round() as u32 + depth).min(100)
}

/// Human-readable advice from the score and what is missing.
pub fn build_recommendations(
    score: u32,
    skill_match: &SkillMatch,
    profile: &UserProfile,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let critical: Vec<&str> = skill_match
        .missing
        .iter()
        .filter(|k| k.priority == Priority::Critical)
        .take(3)
        .map(|k| k.display.as_str())
        .collect();
    if !critical.is_empty() {
        recommendations.push(format!(
            "Address the critical requirements first: {}.",
            critical.join(", ")
        ));
    }

    let mut others: Vec<_> = skill_match
        .missing
        .iter()
        .filter(|k| k.priority != Priority::Critical)
        .collect();
    others.sort_by_key(|k| std::cmp::Reverse(k.priority));
    let others: Vec<&str> = others.iter().take(5).map(|k| k.display.as_str()).collect();
    if !others.is_empty() {
        recommendations.push(format!(
            "Where you have real experience, mention: {}.",
            others.join(", ")
        ));
    }

    if score >= 80 {
        recommendations
            .push("Strong match. Your profile covers the key job requirements.".to_string());
    } else if score >= 60 {
        recommendations.push(format!(
            "Moderate match ({score}/100). Tailor your bullets toward the missing keywords."
        ));
    } else {
        recommendations.push(format!(
            "Low match ({score}/100). Consider whether this role fits or expand your profile."
        ));
    }

    if !profile.has_work_experience() {
        recommendations.push("Add work experience entries to strengthen your profile.".to_string());
    }
    if profile.skills.iter().all(|s| s.trim().is_empty()) {
        recommendations.push("List your core skills so they can be matched directly.".to_string());
    }
    if profile
        .personal_info
        .summary
        .as_deref()
        .map_or(true, |s| s.trim().is_empty())
    {
        recommendations.push("Add a professional summary aimed at the target role.".to_string());
    }

    recommendations
}
