use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Contact block and optional free-text summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub summary: Option<String>,
}

impl PersonalInfo {
    pub fn has_contact(&self) -> bool {
        is_filled(&self.full_name) && (is_filled(&self.email) || is_filled(&self.phone))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkExperienceEntry {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: String,
    pub achievements: Vec<String>,
}

impl WorkExperienceEntry {
    /// Description plus achievements, the part of an entry that is not the heading.
    pub fn body_text(&self) -> String {
        let mut body = self.description.clone();
        for achievement in &self.achievements {
            body.push('\n');
            body.push_str(achievement);
        }
        body
    }

    /// "start - end" with "Present" for current roles; `None` when no dates are known.
    pub fn date_range(&self) -> Option<String> {
        let start = self.start_date.as_deref().filter(|s| !s.trim().is_empty());
        let end = if self.current {
            Some("Present")
        } else {
            self.end_date.as_deref().filter(|s| !s.trim().is_empty())
        };
        match (start, end) {
            (Some(s), Some(e)) => Some(format!("{s} - {e}")),
            (Some(s), None) => Some(s.to_string()),
            (None, Some(e)) => Some(e.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub graduation_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
}

/// A user's stored résumé data. Owned by the persistence layer, read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub personal_info: PersonalInfo,
    pub skills: Vec<String>,
    pub work_experience: Vec<WorkExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<CertificationEntry>,
}

impl UserProfile {
    pub fn has_work_experience(&self) -> bool {
        !self.work_experience.is_empty()
    }

    pub fn has_education(&self) -> bool {
        !self.education.is_empty()
    }

    pub fn has_certifications(&self) -> bool {
        !self.certifications.is_empty()
    }

    /// True when there is nothing at all to analyse.
    pub fn is_empty(&self) -> bool {
        self.skills.iter().all(|s| s.trim().is_empty())
            && self.work_experience.is_empty()
            && self.education.is_empty()
            && self.certifications.is_empty()
    }

    pub fn work_history_text(&self) -> String {
        self.work_experience
            .iter()
            .map(|e| format!("{} {}\n{}", e.title, e.company, e.body_text()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn education_text(&self) -> String {
        self.education
            .iter()
            .map(|e| {
                [
                    Some(e.degree.as_str()),
                    e.field_of_study.as_deref(),
                    Some(e.institution.as_str()),
                    e.description.as_deref(),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn certification_text(&self) -> String {
        self.certifications
            .iter()
            .map(|c| match &c.issuer {
                Some(issuer) => format!("{} {issuer}", c.name),
                None => c.name.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Plain-text rendering sent to the remote scorer.
    pub fn resume_text(&self) -> String {
        let mut sections = Vec::new();
        if let Some(summary) = self.personal_info.summary.as_deref() {
            sections.push(summary.to_string());
        }
        if !self.skills.is_empty() {
            sections.push(format!("Skills: {}", self.skills.join(", ")));
        }
        for text in [
            self.work_history_text(),
            self.education_text(),
            self.certification_text(),
        ] {
            if !text.trim().is_empty() {
                sections.push(text);
            }
        }
        sections.join("\n\n")
    }
}

fn is_filled(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserializes_from_camel_case_with_missing_fields() {
        let json = r#"{
            "userId": "7d1f1d38-4a3f-4e39-9d2c-0a4a2f6e1b11",
            "skills": ["Python", "SQL"],
            "workExperience": [
                {"title": "Data Engineer", "company": "Acme", "description": "Built pipelines", "current": true}
            ]
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.skills.len(), 2);
        assert_eq!(profile.work_experience[0].title, "Data Engineer");
        assert!(profile.work_experience[0].achievements.is_empty());
        assert!(profile.education.is_empty());
        assert!(profile.personal_info.full_name.is_none());
    }

    #[test]
    fn test_empty_profile_detection_ignores_blank_skills() {
        let profile = UserProfile {
            skills: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(profile.is_empty());
    }

    #[test]
    fn test_date_range_uses_present_for_current_roles() {
        let entry = WorkExperienceEntry {
            start_date: Some("2021-03".to_string()),
            end_date: Some("2023-01".to_string()),
            current: true,
            ..Default::default()
        };
        assert_eq!(entry.date_range().as_deref(), Some("2021-03 - Present"));
    }

    #[test]
    fn test_date_range_none_without_dates() {
        assert!(WorkExperienceEntry::default().date_range().is_none());
    }

    #[test]
    fn test_has_contact_requires_name_and_a_channel() {
        let mut info = PersonalInfo {
            full_name: Some("Ada Lovelace".to_string()),
            ..Default::default()
        };
        assert!(!info.has_contact());
        info.email = Some("ada@example.com".to_string());
        assert!(info.has_contact());
    }

    #[test]
    fn test_education_text_joins_present_fields() {
        let profile = UserProfile {
            education: vec![EducationEntry {
                institution: "MIT".to_string(),
                degree: "BSc".to_string(),
                field_of_study: Some("Computer Science".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(profile.education_text(), "BSc Computer Science MIT");
    }
}
