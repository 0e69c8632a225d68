use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::content::GeneratedResumeContent;
use crate::analysis::extractor::ExtractedKeyword;
use crate::analysis::pipeline::MatchResult;
use crate::analysis::scoring::{ScoreBasis, ScoreBreakdown};

/// Row shape of the `analyses` table. Structured payloads are JSONB.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: Option<String>,
    pub job_company: Option<String>,
    pub job_description: String,
    pub keywords: Value,
    pub match_result: Value,
    pub score_breakdown: Value,
    pub score_basis: String,
    pub generated_content: Option<Value>,
    pub vocabulary_version: String,
    pub generation: i64,
    pub created_at: DateTime<Utc>,
}

/// An immutable, persisted analysis. Newer records supersede older ones; none is
/// ever updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: Option<String>,
    pub job_company: Option<String>,
    pub job_description: String,
    pub keywords: Vec<ExtractedKeyword>,
    pub match_result: MatchResult,
    pub score_breakdown: ScoreBreakdown,
    pub score_basis: ScoreBasis,
    pub generated_content: Option<GeneratedResumeContent>,
    pub vocabulary_version: String,
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRow> for AnalysisRecord {
    type Error = serde_json::Error;

    fn try_from(row: AnalysisRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            job_title: row.job_title,
            job_company: row.job_company,
            job_description: row.job_description,
            keywords: serde_json::from_value(row.keywords)?,
            match_result: serde_json::from_value(row.match_result)?,
            score_breakdown: serde_json::from_value(row.score_breakdown)?,
            score_basis: serde_json::from_value(Value::String(row.score_basis))?,
            generated_content: row
                .generated_content
                .map(serde_json::from_value)
                .transpose()?,
            vocabulary_version: row.vocabulary_version,
            generation: row.generation.max(0) as u64,
            created_at: row.created_at,
        })
    }
}

/// Everything needed to insert an analysis; id and timestamp come from the store.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub user_id: Uuid,
    pub job_title: Option<String>,
    pub job_company: Option<String>,
    pub job_description: String,
    pub keywords: Vec<ExtractedKeyword>,
    pub match_result: MatchResult,
    pub score_breakdown: ScoreBreakdown,
    pub score_basis: ScoreBasis,
    pub generated_content: Option<GeneratedResumeContent>,
    pub vocabulary_version: String,
    pub generation: u64,
}

impl NewAnalysis {
    /// Stamps the new record with its store-assigned identity.
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            id,
            user_id: self.user_id,
            job_title: self.job_title,
            job_company: self.job_company,
            job_description: self.job_description,
            keywords: self.keywords,
            match_result: self.match_result,
            score_breakdown: self.score_breakdown,
            score_basis: self.score_basis,
            generated_content: self.generated_content,
            vocabulary_version: self.vocabulary_version,
            generation: self.generation,
            created_at,
        }
    }
}
