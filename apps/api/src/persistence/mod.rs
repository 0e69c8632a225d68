//! Storage boundary for profiles and analyses.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, NewAnalysis};
use crate::models::profile::UserProfile;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored payload is malformed: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[cfg(test)]
    #[error("store unavailable")]
    Unavailable,
}

/// Read access to user profiles. Profiles are owned by another service.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_user_profile(&self, user_id: Uuid)
        -> Result<Option<UserProfile>, PersistenceError>;
}

/// Append-only analysis history.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn save_analysis(&self, new: NewAnalysis) -> Result<AnalysisRecord, PersistenceError>;

    async fn latest_analysis(&self, user_id: Uuid)
        -> Result<Option<AnalysisRecord>, PersistenceError>;

    /// Newest first.
    async fn list_analyses(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AnalysisRecord>, PersistenceError>;

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisRecord>, PersistenceError>;
}
