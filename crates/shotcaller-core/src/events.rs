use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::WorkoutRecord;

/// Every state change in the session produces an Event.
///
/// The timer writes events into the orchestrator, which fans them out on a
/// broadcast channel; UI and audio collaborators subscribe. The rest-period
/// marks are exact contracts: `RestWarning` fires at 10 seconds left and
/// `RestBell` at 5, each at most once per rest period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Pre-round countdown began (fixed 5 seconds before round one,
    /// also used when resuming a logged session).
    PreRoundStarted {
        round: u32,
        countdown_secs: u32,
        at: DateTime<Utc>,
    },
    RoundStarted {
        round: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    RoundEnded {
        round: u32,
        at: DateTime<Utc>,
    },
    RestStarted {
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// Fires exactly once per rest period, at 10 seconds remaining.
    RestWarning {
        at: DateTime<Utc>,
    },
    /// Fires exactly once per rest period, at 5 seconds remaining.
    RestBell {
        at: DateTime<Utc>,
    },
    RestEnded {
        next_round: u32,
        at: DateTime<Utc>,
    },
    WorkoutCompleted {
        rounds_completed: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        at: DateTime<Utc>,
    },
    SessionResumed {
        at: DateTime<Utc>,
    },
    /// Session manually stopped; carries the resumable record so the
    /// workout-log collaborator can persist it.
    SessionStopped {
        record: WorkoutRecord,
        at: DateTime<Utc>,
    },
    /// One technique prompt finished narrating.
    CalloutSpoken {
        text: String,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// A callout or announcement could not be narrated. The timer keeps
    /// running; subscribers decide how loudly to complain.
    NarrationFailed {
        message: String,
        at: DateTime<Utc>,
    },
    /// The interruption monitor asserted a pause (phone call heuristic).
    InterruptionDetected {
        reason: String,
        at: DateTime<Utc>,
    },
    /// Foreground regained; the session stays paused until the user acts.
    InterruptionCleared {
        at: DateTime<Utc>,
    },
}
