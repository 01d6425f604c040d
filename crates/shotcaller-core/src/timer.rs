//! Session timer state machine.
//!
//! The timer is a second-granularity state machine with no internal thread:
//! the orchestrator calls `tick()` once per elapsed second and forwards the
//! returned events. Pausing freezes the counters exactly; no tick is lost
//! or double-counted across a pause.
//!
//! ## State transitions
//!
//! ```text
//! Ready -> PreRound -> Running -> (Resting -> Running)* -> Complete
//! ```
//!
//! `paused` overlays PreRound/Running/Resting without resetting anything;
//! `stop()` exits from any state back to Ready.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::events::Event;
use crate::record::WorkoutRecord;
use crate::settings::SessionSettings;

/// Fixed countdown before the first round.
pub const PRE_ROUND_SECS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Ready,
    /// Countdown before a round begins, giving the user time to get set.
    PreRound,
    Running,
    Resting,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Ready => write!(f, "ready"),
            Phase::PreRound => write!(f, "pre-round"),
            Phase::Running => write!(f, "running"),
            Phase::Resting => write!(f, "resting"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// Durations the timer counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerParams {
    pub rounds_planned: u32,
    pub round_secs: u32,
    pub rest_secs: u32,
}

impl TimerParams {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self {
            rounds_planned: settings.rounds_count.max(1),
            round_secs: settings.round_secs(),
            rest_secs: settings.rest_secs(),
        }
    }
}

/// The authoritative round/rest clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimer {
    params: TimerParams,
    phase: Phase,
    paused: bool,
    current_round: u32,
    time_left: u32,
    rest_time_left: u32,
    pre_round_left: u32,
    /// Per-rest-period latches so the 10 s / 5 s marks fire exactly once
    /// even across a pause/resume inside the same rest.
    rest_warning_fired: bool,
    rest_bell_fired: bool,
}

impl SessionTimer {
    pub fn new(params: TimerParams) -> Self {
        Self {
            params,
            phase: Phase::Ready,
            paused: false,
            current_round: 0,
            time_left: 0,
            rest_time_left: 0,
            pre_round_left: 0,
            rest_warning_fired: false,
            rest_bell_fired: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn rest_time_left(&self) -> u32 {
        self.rest_time_left
    }

    pub fn pre_round_left(&self) -> u32 {
        self.pre_round_left
    }

    pub fn params(&self) -> TimerParams {
        self.params
    }

    /// True while a session exists (started and neither stopped nor done).
    pub fn is_live(&self) -> bool {
        matches!(self.phase, Phase::PreRound | Phase::Running | Phase::Resting)
    }

    /// Activation rule for the callout scheduler: an active round, not
    /// paused, not resting, not in the pre-round countdown.
    pub fn callouts_active(&self) -> bool {
        self.phase == Phase::Running && !self.paused
    }

    /// Rounds that count as finished right now. A round interrupted with
    /// time on the clock does not count.
    pub fn rounds_completed(&self) -> u32 {
        match self.phase {
            Phase::Ready => 0,
            Phase::Complete => self.params.rounds_planned,
            Phase::Resting => self.current_round,
            Phase::PreRound => self.current_round.saturating_sub(1),
            Phase::Running => {
                if self.time_left > 0 {
                    self.current_round.saturating_sub(1)
                } else {
                    self.current_round
                }
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session. Valid only from `Ready`. The caller is
    /// responsible for verifying the technique pool beforehand.
    pub fn start(&mut self) -> Result<Vec<Event>, SessionError> {
        if self.phase != Phase::Ready {
            return Err(SessionError::InvalidState {
                command: "start".into(),
                state: self.phase.to_string(),
            });
        }
        self.current_round = 1;
        self.enter_pre_round();
        Ok(vec![Event::PreRoundStarted {
            round: self.current_round,
            countdown_secs: self.pre_round_left,
            at: Utc::now(),
        }])
    }

    /// Reconstruct a session from a logged record: the next unfinished
    /// round re-enters through the pre-round countdown, never mid-round.
    pub fn resume_from(&mut self, record: &WorkoutRecord) -> Result<Vec<Event>, SessionError> {
        if self.phase != Phase::Ready {
            return Err(SessionError::InvalidState {
                command: "resume_from".into(),
                state: self.phase.to_string(),
            });
        }
        if record.rounds_completed >= self.params.rounds_planned {
            return Err(SessionError::InvalidResume(format!(
                "record already complete ({}/{} rounds)",
                record.rounds_completed, self.params.rounds_planned
            )));
        }
        self.current_round = record.rounds_completed + 1;
        self.enter_pre_round();
        Ok(vec![Event::PreRoundStarted {
            round: self.current_round,
            countdown_secs: self.pre_round_left,
            at: Utc::now(),
        }])
    }

    /// Toggle the pause flag. Valid only while a session is live.
    pub fn toggle_pause(&mut self) -> Result<Vec<Event>, SessionError> {
        if !self.is_live() {
            return Err(SessionError::InvalidState {
                command: "pause".into(),
                state: self.phase.to_string(),
            });
        }
        self.paused = !self.paused;
        let at = Utc::now();
        Ok(vec![if self.paused {
            Event::SessionPaused { at }
        } else {
            Event::SessionResumed { at }
        }])
    }

    /// Fail-safe pause asserted by the interruption monitor. Only takes
    /// effect during an active round; pre-round, rest, and an existing
    /// pause are left alone.
    pub fn force_pause(&mut self) -> Option<Event> {
        if self.phase == Phase::Running && !self.paused {
            self.paused = true;
            return Some(Event::SessionPaused { at: Utc::now() });
        }
        None
    }

    /// Unconditionally reset to `Ready`. Returns the rounds that counted;
    /// any "abandoned session" bookkeeping is the caller's job.
    pub fn stop(&mut self) -> u32 {
        let completed = self.rounds_completed();
        *self = Self::new(self.params);
        completed
    }

    /// Advance the clock by one second. Call once per elapsed second;
    /// returns the events that second produced. No-op while paused.
    pub fn tick(&mut self) -> Vec<Event> {
        if self.paused {
            return Vec::new();
        }
        match self.phase {
            Phase::PreRound => self.tick_pre_round(),
            Phase::Running => self.tick_running(),
            Phase::Resting => self.tick_resting(),
            Phase::Ready | Phase::Complete => Vec::new(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_pre_round(&mut self) {
        self.phase = Phase::PreRound;
        self.paused = false;
        self.pre_round_left = PRE_ROUND_SECS;
        self.time_left = 0;
        self.rest_time_left = 0;
    }

    fn begin_round(&mut self) -> Event {
        self.phase = Phase::Running;
        self.time_left = self.params.round_secs;
        Event::RoundStarted {
            round: self.current_round,
            duration_secs: self.params.round_secs,
            at: Utc::now(),
        }
    }

    fn tick_pre_round(&mut self) -> Vec<Event> {
        self.pre_round_left = self.pre_round_left.saturating_sub(1);
        if self.pre_round_left == 0 {
            vec![self.begin_round()]
        } else {
            Vec::new()
        }
    }

    fn tick_running(&mut self) -> Vec<Event> {
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return Vec::new();
        }
        let at = Utc::now();
        let mut events = vec![Event::RoundEnded {
            round: self.current_round,
            at,
        }];
        if self.current_round >= self.params.rounds_planned {
            self.phase = Phase::Complete;
            events.push(Event::WorkoutCompleted {
                rounds_completed: self.current_round,
                at,
            });
        } else {
            self.phase = Phase::Resting;
            self.rest_time_left = self.params.rest_secs;
            self.rest_warning_fired = false;
            self.rest_bell_fired = false;
            events.push(Event::RestStarted {
                duration_secs: self.params.rest_secs,
                at,
            });
        }
        events
    }

    fn tick_resting(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        // Marks fire at the instant the countdown reads 10 / 5, before the
        // decrement, so a rest of exactly 10 seconds still gets its warning.
        if self.rest_time_left == 10 && !self.rest_warning_fired {
            self.rest_warning_fired = true;
            events.push(Event::RestWarning { at: Utc::now() });
        }
        if self.rest_time_left == 5 && !self.rest_bell_fired {
            self.rest_bell_fired = true;
            events.push(Event::RestBell { at: Utc::now() });
        }
        self.rest_time_left = self.rest_time_left.saturating_sub(1);
        if self.rest_time_left == 0 {
            // The only place the round counter moves up.
            self.current_round += 1;
            events.push(Event::RestEnded {
                next_round: self.current_round,
                at: Utc::now(),
            });
            events.push(self.begin_round());
        }
        events
    }
}
