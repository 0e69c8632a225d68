use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, AnalysisRow, NewAnalysis};
use crate::models::profile::UserProfile;
use crate::persistence::{AnalysisStore, PersistenceError, ProfileStore};

const ANALYSIS_COLUMNS: &str = "id, user_id, job_title, job_company, job_description, keywords, \
     match_result, score_breakdown, score_basis, generated_content, vocabulary_version, \
     generation, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_user_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>, PersistenceError> {
        let profile: Option<Value> =
            sqlx::query_scalar("SELECT profile FROM user_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        profile
            .map(|value| {
                let mut profile: UserProfile = serde_json::from_value(value)?;
                profile.user_id = user_id;
                Ok::<_, PersistenceError>(profile)
            })
            .transpose()
    }
}

#[async_trait]
impl AnalysisStore for PgStore {
    async fn save_analysis(&self, new: NewAnalysis) -> Result<AnalysisRecord, PersistenceError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        let keywords = serde_json::to_value(&new.keywords)?;
        let match_result = serde_json::to_value(&new.match_result)?;
        let score_breakdown = serde_json::to_value(new.score_breakdown)?;
        let score_basis = match serde_json::to_value(new.score_basis)? {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let generated_content = new
            .generated_content
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO analyses
                (id, user_id, job_title, job_company, job_description, keywords,
                 match_result, score_breakdown, score_basis, generated_content,
                 vocabulary_version, generation, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(id)
        .bind(new.user_id)
        .bind(&new.job_title)
        .bind(&new.job_company)
        .bind(&new.job_description)
        .bind(keywords)
        .bind(match_result)
        .bind(score_breakdown)
        .bind(score_basis)
        .bind(generated_content)
        .bind(&new.vocabulary_version)
        .bind(i64::try_from(new.generation).unwrap_or(i64::MAX))
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        info!("Saved analysis {id} for user {}", new.user_id);
        Ok(new.into_record(id, created_at))
    }

    async fn latest_analysis(
        &self,
        user_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, PersistenceError> {
        Ok(self.list_analyses(user_id, 1).await?.into_iter().next())
    }

    async fn list_analyses(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError> {
        let rows: Vec<AnalysisRow> = sqlx::query_as(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE user_id = $1 \
             ORDER BY created_at DESC, generation DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| AnalysisRecord::try_from(row).map_err(PersistenceError::from))
            .collect()
    }

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisRecord>, PersistenceError> {
        let row: Option<AnalysisRow> =
            sqlx::query_as(&format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(AnalysisRecord::try_from).transpose()?)
    }
}
