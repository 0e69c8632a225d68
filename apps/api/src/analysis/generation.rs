use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

/// Per-user request generations. Each analysis request takes a new generation;
/// only the holder of the latest one may persist its result.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    latest: Mutex<HashMap<Uuid, u64>>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next generation for `user_id`, superseding any in flight.
    pub fn issue(&self, user_id: Uuid) -> u64 {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let generation = latest.entry(user_id).or_insert(0);
        *generation += 1;
        *generation
    }

    pub fn is_current(&self, user_id: Uuid, generation: u64) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.get(&user_id).copied() == Some(generation)
    }
}
