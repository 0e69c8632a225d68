//! Content Generator: assembles keyword-biased résumé markup from a profile.
//!
//! No LLM calls. Picks the most relevant experience entries, trims bullet lists and
//! appends one missing-but-relevant keyword per entry when it fits the length budget.
//! Missing profile fields degrade to placeholder text; this never fails.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::extractor::{ExtractedKeyword, KeywordCategory};
use crate::analysis::matcher::{entry_relevance, MatchSource, SkillMatch, TermMatcher};
use crate::models::posting::JobPosting;
use crate::models::profile::{UserProfile, WorkExperienceEntry};

pub const MAX_SELECTED_EXPERIENCE: usize = 3;
pub const MAX_BULLETS_PER_ENTRY: usize = 4;
/// Max chars of a bullet after a keyword clause is appended.
pub const BULLET_LENGTH_BUDGET: usize = 160;

const MAX_SKILLS: usize = 12;
const MAX_EDUCATION: usize = 3;
const MAX_CERTIFICATIONS: usize = 5;
const SUMMARY_KEYWORDS: usize = 3;

const PLACEHOLDER_NAME: &str = "Your Name";
const PLACEHOLDER_SUMMARY: &str =
    "_Add a professional summary that highlights your most relevant experience._";
const PLACEHOLDER_SKILLS: &str = "_Add your core skills._";
const PLACEHOLDER_EXPERIENCE: &str = "_Add your work experience to generate tailored bullets._";
const PLACEHOLDER_EDUCATION: &str = "_Add your education history._";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedExperience {
    pub title: String,
    pub company: String,
    pub date_range: Option<String>,
    pub relevance: f32,
    pub bullets: Vec<String>,
    pub integrated_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBreakdown {
    pub selected_experience: Vec<SelectedExperience>,
    pub integrated_keywords: Vec<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResumeContent {
    pub markup: String,
    pub breakdown: ContentBreakdown,
}

pub struct ContentRequest<'a> {
    pub posting: &'a JobPosting,
    pub profile: &'a UserProfile,
    pub skill_match: &'a SkillMatch,
    pub matcher: &'a TermMatcher<'a>,
}

pub fn generate_content(request: ContentRequest<'_>) -> GeneratedResumeContent {
    let ContentRequest {
        posting,
        profile,
        skill_match,
        matcher,
    } = request;

    let skills = select_skills(profile, skill_match);
    let selected_experience = select_experience(profile, skill_match, matcher);
    let integrated_keywords: Vec<String> = selected_experience
        .iter()
        .flat_map(|e| e.integrated_keywords.iter().cloned())
        .collect();

    let mut sections = vec![render_header(profile)];

    sections.push(format!(
        "## Professional Summary\n\n{}",
        render_summary(posting, profile, skill_match)
    ));

    sections.push(if skills.is_empty() {
        format!("## Core Skills\n\n{PLACEHOLDER_SKILLS}")
    } else {
        format!("## Core Skills\n\n{}", skills.join(" • "))
    });

    sections.push(render_experience(&selected_experience));
    sections.push(render_education(profile));
    if let Some(certifications) = render_certifications(profile) {
        sections.push(certifications);
    }

    let mut markup = sections.join("\n\n");
    markup.push('\n');

    GeneratedResumeContent {
        markup,
        breakdown: ContentBreakdown {
            selected_experience,
            integrated_keywords,
            skills,
        },
    }
}

/// Matched skills first (the user's spelling when matched from the skill list), then
/// the remaining skills, case-insensitively deduplicated.
fn select_skills(profile: &UserProfile, skill_match: &SkillMatch) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    let push = |candidate: &str, skills: &mut Vec<String>| {
        let candidate = candidate.trim();
        if candidate.is_empty()
            || skills.iter().any(|s| s.eq_ignore_ascii_case(candidate))
            || skills.len() >= MAX_SKILLS
        {
            return;
        }
        skills.push(candidate.to_string());
    };

    for m in &skill_match.matched {
        match m.source {
            MatchSource::Skill => push(&m.evidence, &mut skills),
            _ => push(&m.keyword.display, &mut skills),
        }
    }
    for skill in &profile.skills {
        push(skill, &mut skills);
    }
    skills
}

fn select_experience(
    profile: &UserProfile,
    skill_match: &SkillMatch,
    matcher: &TermMatcher<'_>,
) -> Vec<SelectedExperience> {
    let matched_terms = skill_match.matched_terms();

    let mut ranked: Vec<(f32, &WorkExperienceEntry)> = profile
        .work_experience
        .iter()
        .map(|entry| (entry_relevance(entry, &matched_terms, matcher), entry))
        .collect();
    // Stable: equally relevant entries keep profile order
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(MAX_SELECTED_EXPERIENCE);

    let mut candidates = injection_candidates(&skill_match.missing);

    ranked
        .into_iter()
        .map(|(relevance, entry)| {
            let mut bullets = entry_bullets(entry);
            let mut integrated_keywords = Vec::new();
            if let Some(term) = integrate_keyword(&mut bullets, &mut candidates) {
                integrated_keywords.push(term);
            }
            SelectedExperience {
                title: entry.title.trim().to_string(),
                company: entry.company.trim().to_string(),
                date_range: entry.date_range(),
                relevance,
                bullets,
                integrated_keywords,
            }
        })
        .collect()
}

/// Missing keywords worth weaving into bullets, strongest first.
fn injection_candidates(missing: &[ExtractedKeyword]) -> Vec<&ExtractedKeyword> {
    let mut candidates: Vec<&ExtractedKeyword> = missing
        .iter()
        .filter(|k| {
            matches!(
                k.category,
                KeywordCategory::Technical | KeywordCategory::Tool | KeywordCategory::Methodology
            )
        })
        .collect();
    candidates.sort_by_key(|k| std::cmp::Reverse(k.priority));
    candidates
}

/// Appends the first candidate that fits under the budget to the first bullet it fits
/// on. The used candidate is removed so each keyword is integrated at most once.
fn integrate_keyword(
    bullets: &mut [String],
    candidates: &mut Vec<&ExtractedKeyword>,
) -> Option<String> {
    let (ci, bi, extended) = candidates.iter().enumerate().find_map(|(ci, candidate)| {
        bullets.iter().enumerate().find_map(|(bi, bullet)| {
            let extended = append_keyword(bullet, &candidate.display);
            (extended.chars().count() <= BULLET_LENGTH_BUDGET).then_some((ci, bi, extended))
        })
    })?;
    bullets[bi] = extended;
    Some(candidates.remove(ci).term.clone())
}

fn append_keyword(bullet: &str, keyword: &str) -> String {
    match bullet.strip_suffix('.') {
        Some(stem) => format!("{stem} using {keyword}."),
        None => format!("{bullet} using {keyword}"),
    }
}

/// Achievements if any, else description sentences; at most `MAX_BULLETS_PER_ENTRY`.
fn entry_bullets(entry: &WorkExperienceEntry) -> Vec<String> {
    let achievements: Vec<String> = entry
        .achievements
        .iter()
        .map(|a| clean_bullet(a))
        .filter(|a| !a.is_empty())
        .collect();

    let bullets = if achievements.is_empty() {
        description_sentences(&entry.description)
            .into_iter()
            .map(clean_bullet)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.ends_with(['.', '!', '?']) {
                    s
                } else {
                    format!("{s}.")
                }
            })
            .collect()
    } else {
        achievements
    };

    bullets.into_iter().take(MAX_BULLETS_PER_ENTRY).collect()
}

/// Splits prose into sentences, keeping terminal punctuation. A period only ends a
/// sentence when whitespace or the end of text follows it ("$1.2M", "Node.js" stay whole).
fn description_sentences(description: &str) -> Vec<&str> {
    static BREAK: OnceLock<Regex> = OnceLock::new();
    let pattern = BREAK
        .get_or_init(|| Regex::new(r"([.!?]+)(?:\s+|$)|\n+").expect("sentence pattern is valid"));

    let mut sentences = Vec::new();
    let mut start = 0;
    for caps in pattern.captures_iter(description) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let end = caps.get(1).map_or(whole.start(), |punct| punct.end());
        sentences.push(&description[start..end]);
        start = whole.end();
    }
    sentences.push(&description[start..]);
    sentences
}

fn clean_bullet(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(['-', '*', '•'])
        .trim()
        .to_string()
}

fn render_header(profile: &UserProfile) -> String {
    let info = &profile.personal_info;
    let name = info
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(PLACEHOLDER_NAME);

    let contact: Vec<&str> = [&info.email, &info.phone, &info.location, &info.linkedin]
        .into_iter()
        .filter_map(|v| v.as_deref().map(str::trim).filter(|v| !v.is_empty()))
        .collect();

    if contact.is_empty() {
        format!("# {name}")
    } else {
        format!("# {name}\n\n{}", contact.join(" | "))
    }
}

fn render_summary(posting: &JobPosting, profile: &UserProfile, skill_match: &SkillMatch) -> String {
    if let Some(summary) = profile
        .personal_info
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return summary.to_string();
    }

    let headline = profile
        .work_experience
        .first()
        .map(|e| e.title.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or("Professional");

    let target = match (posting.title(), posting.company()) {
        (Some(title), Some(company)) => Some(format!("the {title} role at {company}")),
        (Some(title), None) => Some(format!("the {title} role")),
        (None, Some(company)) => Some(format!("a role at {company}")),
        (None, None) => None,
    };

    let highlights: Vec<&str> = skill_match
        .matched
        .iter()
        .take(SUMMARY_KEYWORDS)
        .map(|m| m.keyword.display.as_str())
        .collect();

    match (highlights.is_empty(), target) {
        (false, Some(target)) => format!(
            "{headline} with hands-on experience in {}, seeking {target}.",
            natural_join(&highlights)
        ),
        (false, None) => format!(
            "{headline} with hands-on experience in {}.",
            natural_join(&highlights)
        ),
        (true, Some(target)) => format!("{headline} seeking {target}."),
        (true, None) => PLACEHOLDER_SUMMARY.to_string(),
    }
}

fn render_experience(selected: &[SelectedExperience]) -> String {
    if selected.is_empty() {
        return format!("## Professional Experience\n\n{PLACEHOLDER_EXPERIENCE}");
    }

    let entries: Vec<String> = selected
        .iter()
        .map(|e| {
            let heading = match (e.title.is_empty(), e.company.is_empty()) {
                (false, false) => format!("### {} | {}", e.title, e.company),
                (false, true) => format!("### {}", e.title),
                (true, false) => format!("### {}", e.company),
                (true, true) => "### Position".to_string(),
            };
            let mut block = heading;
            if let Some(dates) = &e.date_range {
                block.push_str(&format!("\n\n*{dates}*"));
            }
            if !e.bullets.is_empty() {
                block.push_str("\n\n");
                block.push_str(
                    &e.bullets
                        .iter()
                        .map(|b| format!("- {b}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
            }
            block
        })
        .collect();

    format!("## Professional Experience\n\n{}", entries.join("\n\n"))
}

fn render_education(profile: &UserProfile) -> String {
    if profile.education.is_empty() {
        return format!("## Education\n\n{PLACEHOLDER_EDUCATION}");
    }

    let lines: Vec<String> = profile
        .education
        .iter()
        .take(MAX_EDUCATION)
        .map(|e| {
            let degree = match e.field_of_study.as_deref().map(str::trim) {
                Some(field) if !field.is_empty() => format!("{} in {field}", e.degree.trim()),
                _ => e.degree.trim().to_string(),
            };
            let mut line = format!("- **{degree}**, {}", e.institution.trim());
            if let Some(date) = e.graduation_date.as_deref().filter(|d| !d.trim().is_empty()) {
                line.push_str(&format!(" ({})", date.trim()));
            }
            line
        })
        .collect();

    format!("## Education\n\n{}", lines.join("\n"))
}

fn render_certifications(profile: &UserProfile) -> Option<String> {
    if profile.certifications.is_empty() {
        return None;
    }

    let lines: Vec<String> = profile
        .certifications
        .iter()
        .take(MAX_CERTIFICATIONS)
        .map(|c| {
            let mut line = format!("- {}", c.name.trim());
            if let Some(issuer) = c.issuer.as_deref().filter(|i| !i.trim().is_empty()) {
                line.push_str(&format!(", {}", issuer.trim()));
            }
            if let Some(date) = c.issue_date.as_deref().filter(|d| !d.trim().is_empty()) {
                line.push_str(&format!(" ({})", date.trim()));
            }
            line
        })
        .collect();

    Some(format!("## Certifications\n\n{}", lines.join("\n")))
}

/// "a", "a and b", "a, b and c"
fn natural_join(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    }
}
