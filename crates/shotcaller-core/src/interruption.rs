//! Interruption monitor.
//!
//! Watches for the host taking focus or audio away mid-round (screen off,
//! phone call, another app grabbing the audio device). A brief blip is
//! tolerated; past the threshold the session must be paused, and it stays
//! paused until the user explicitly resumes. Auto-resuming after an
//! unknown gap would restart callouts into a round the athlete already
//! mentally left.
//!
//! Like the session timer, the monitor is tick-driven: the orchestrator's
//! 1 Hz loop calls `tick()` and acts on what it returns, so the threshold
//! is counted in the same clock the rest of the session runs on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tolerated gap, in ticks (seconds), before a loss of focus counts as an
/// interruption.
pub const DEFAULT_THRESHOLD_SECS: u32 = 2;

/// Why the session was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionReason {
    /// The app or screen went away.
    Hidden,
    /// The audio device was claimed by something else.
    AudioFocusLost,
}

impl std::fmt::Display for InterruptionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterruptionReason::Hidden => write!(f, "app hidden"),
            InterruptionReason::AudioFocusLost => write!(f, "audio focus lost"),
        }
    }
}

/// An interruption that crossed the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptionState {
    pub reason: InterruptionReason,
    /// When focus was first lost, not when the threshold was crossed.
    pub since: DateTime<Utc>,
}

#[derive(Debug)]
pub struct InterruptionMonitor {
    threshold_secs: u32,
    lost: Option<Pending>,
    active: Option<InterruptionState>,
}

#[derive(Debug)]
struct Pending {
    reason: InterruptionReason,
    since: DateTime<Utc>,
    ticks: u32,
}

impl Default for InterruptionMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_SECS)
    }
}

impl InterruptionMonitor {
    pub fn new(threshold_secs: u32) -> Self {
        Self {
            threshold_secs,
            lost: None,
            active: None,
        }
    }

    // ── Queries ──

    /// The interruption currently requiring a manual resume, if any.
    pub fn active(&self) -> Option<&InterruptionState> {
        self.active.as_ref()
    }

    // ── Commands ──

    /// Focus or audio went away. A later, different reason does not
    /// replace the first one.
    pub fn on_lost(&mut self, reason: InterruptionReason) {
        if self.lost.is_none() {
            self.lost = Some(Pending {
                reason,
                since: Utc::now(),
                ticks: 0,
            });
        }
    }

    /// Focus came back. A gap shorter than the threshold is forgotten; an
    /// interruption that already triggered stays active until `clear`.
    pub fn on_regained(&mut self) {
        self.lost = None;
    }

    /// Advance the monitor by one tick. Returns the interruption exactly
    /// once, at the tick where the gap crosses the threshold; the caller
    /// pauses the session and announces it.
    pub fn tick(&mut self) -> Option<InterruptionState> {
        if self.active.is_some() {
            return None;
        }
        let pending = self.lost.as_mut()?;
        pending.ticks += 1;
        if pending.ticks >= self.threshold_secs {
            let state = InterruptionState {
                reason: pending.reason,
                since: pending.since,
            };
            self.active = Some(state);
            Some(state)
        } else {
            None
        }
    }

    /// The user acknowledged the pause. Returns whether an interruption
    /// was actually pending.
    pub fn clear(&mut self) -> bool {
        self.lost = None;
        self.active.take().is_some()
    }
}
