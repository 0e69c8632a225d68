use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, NewAnalysis};
use crate::models::profile::UserProfile;
use crate::persistence::{AnalysisStore, PersistenceError, ProfileStore};

/// In-memory store for handler and router tests.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
    analyses: Mutex<Vec<AnalysisRecord>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id, profile);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn analysis_count(&self) -> usize {
        self.analyses.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_user_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>, PersistenceError> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save_analysis(&self, new: NewAnalysis) -> Result<AnalysisRecord, PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable);
        }
        let mut analyses = self.analyses.lock().unwrap();
        // Strictly increasing timestamps keep "newest first" well defined in tests.
        let created_at = Utc::now() + Duration::milliseconds(analyses.len() as i64);
        let record = new.into_record(Uuid::new_v4(), created_at);
        analyses.push(record.clone());
        Ok(record)
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
        let mut records: Vec<AnalysisRecord> = self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisRecord>, PersistenceError> {
        Ok(self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}
