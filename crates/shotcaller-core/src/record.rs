//! Resumable workout snapshot.
//!
//! The core does not persist anything itself; it emits a `WorkoutRecord`
//! when a session stops or completes, and accepts the same shape back via
//! `SessionTimer::resume_from` to reconstruct an abandoned session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::{Difficulty, SessionSettings};

/// Snapshot of one workout, emitted on stop/complete.
///
/// The headline numbers are duplicated out of `settings` so a log line can
/// be rendered without digging into the nested struct; the full settings
/// ride along so a resumed session plays back exactly as it was set up
/// (southpaw, ordered reading, voice) regardless of the current config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub rounds_planned: u32,
    pub rounds_completed: u32,
    pub round_length_min: f64,
    pub rest_minutes: f64,
    pub difficulty: Difficulty,
    /// Total technique prompts narrated during the session.
    pub shots_called_out: u64,
    /// Category keys the pool was built from.
    pub categories: Vec<String>,
    /// The settings the session ran with.
    #[serde(default)]
    pub settings: SessionSettings,
}

impl WorkoutRecord {
    pub fn new(rounds_completed: u32, shots_called_out: u64, settings: SessionSettings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            rounds_planned: settings.rounds_count,
            rounds_completed,
            round_length_min: settings.round_min,
            rest_minutes: settings.rest_minutes,
            difficulty: settings.difficulty,
            shots_called_out,
            categories: settings.categories.clone(),
            settings,
        }
    }

    /// True when every planned round was finished.
    pub fn is_complete(&self) -> bool {
        self.rounds_completed >= self.rounds_planned
    }

    /// Rounds still owed if the session is resumed from this record.
    pub fn rounds_remaining(&self) -> u32 {
        self.rounds_planned.saturating_sub(self.rounds_completed)
    }
}
