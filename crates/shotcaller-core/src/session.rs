//! Session orchestrator.
//!
//! Wires the timer, the callout scheduler, the narration engine, and the
//! interruption monitor together and fans every state change out on a
//! broadcast channel. Three tasks cooperate:
//!
//! - the tick loop drives the timer at 1 Hz and feeds the monitor,
//! - the announcer narrates phase changes ("Get ready", "Rest", ...),
//! - the callout loop paces technique prompts through the feedback delay.
//!
//! The callout loop re-checks the activation rule at fire time, so a pause
//! or round end that lands while a delay is pending silently swallows the
//! prompt instead of speaking into a rest period.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::error::{NarrationError, SessionError};
use crate::events::Event;
use crate::interruption::{InterruptionMonitor, InterruptionReason, InterruptionState};
use crate::narration::{Narrator, Utterance};
use crate::pool::PoolBuilder;
use crate::record::WorkoutRecord;
use crate::scheduler::{CadenceProfile, CalloutScheduler};
use crate::settings::SessionSettings;
use crate::techniques::TechniqueLibrary;
use crate::timer::{Phase, SessionTimer, TimerParams};

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct State {
    timer: SessionTimer,
    scheduler: CalloutScheduler,
    monitor: InterruptionMonitor,
    rng: Pcg64,
}

/// Point-in-time view of the session for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub paused: bool,
    pub current_round: u32,
    pub rounds_planned: u32,
    pub time_left: u32,
    pub rest_time_left: u32,
    pub pre_round_left: u32,
    pub shots_called: u64,
    pub interruption: Option<InterruptionState>,
}

/// One training session from start to stop.
///
/// Cheap to clone; clones share the same state and event channel.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<Event>,
    narrator: Narrator,
    settings: SessionSettings,
}

impl Session {
    /// Build a session. Fails only when the selected categories produce no
    /// callable techniques; every other problem degrades at runtime.
    pub fn new(
        settings: SessionSettings,
        library: &TechniqueLibrary,
        narrator: Narrator,
    ) -> Result<Self, SessionError> {
        Self::with_seed(settings, library, narrator, rand::random())
    }

    /// Same as `new` with a fixed RNG seed for reproducible pools and
    /// pacing.
    pub fn with_seed(
        settings: SessionSettings,
        library: &TechniqueLibrary,
        narrator: Narrator,
        seed: u64,
    ) -> Result<Self, SessionError> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let pool = PoolBuilder::new(library)
            .categories(settings.categories.iter().cloned())
            .add_calisthenics(settings.add_calisthenics)
            .shuffle(!settings.read_in_order)
            .build(&mut rng);
        if pool.is_empty() {
            return Err(SessionError::EmptyPool);
        }
        let scheduler = CalloutScheduler::new(
            pool,
            CadenceProfile::for_difficulty(settings.difficulty),
            settings.read_in_order,
            settings.southpaw_mode,
        );
        let timer = SessionTimer::new(TimerParams::from_settings(&settings));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            state: Arc::new(Mutex::new(State {
                timer,
                scheduler,
                monitor: InterruptionMonitor::default(),
                rng,
            })),
            events,
            narrator,
            settings,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            phase: state.timer.phase(),
            paused: state.timer.paused(),
            current_round: state.timer.current_round(),
            rounds_planned: state.timer.params().rounds_planned,
            time_left: state.timer.time_left(),
            rest_time_left: state.timer.rest_time_left(),
            pre_round_left: state.timer.pre_round_left(),
            shots_called: state.scheduler.shots_called(),
            interruption: state.monitor.active().copied(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the pre-round countdown and spawn the driving tasks.
    ///
    /// The audio primer is issued synchronously, before the first await,
    /// so backends that tie audio permission to the user's action see the
    /// request in the same call stack.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.narrator.prime(self.settings.voice_speed);
        let events = {
            let mut state = self.state.lock().await;
            state.timer.start()?
        };
        self.spawn_tasks();
        self.forward(events);
        Ok(())
    }

    /// Pick a logged session back up at its next unfinished round.
    pub async fn resume_from(&self, record: &WorkoutRecord) -> Result<(), SessionError> {
        self.narrator.prime(self.settings.voice_speed);
        let events = {
            let mut state = self.state.lock().await;
            state.timer.resume_from(record)?
        };
        self.spawn_tasks();
        self.forward(events);
        Ok(())
    }

    /// Pause or resume. Pausing cancels the in-flight utterance; resuming
    /// also acknowledges a pending interruption.
    pub async fn toggle_pause(&self) -> Result<(), SessionError> {
        let (events, now_paused, cleared) = {
            let mut state = self.state.lock().await;
            let events = state.timer.toggle_pause()?;
            let now_paused = state.timer.paused();
            let cleared = if now_paused {
                false
            } else {
                state.monitor.clear()
            };
            (events, now_paused, cleared)
        };
        if now_paused {
            self.narrator.pause().await;
        } else {
            self.narrator.resume();
        }
        self.forward(events);
        if cleared {
            self.forward(vec![Event::InterruptionCleared { at: Utc::now() }]);
        }
        Ok(())
    }

    /// Stop the session and return the resumable record. The record is
    /// also carried on the `SessionStopped` event for log collaborators.
    pub async fn stop(&self) -> WorkoutRecord {
        let record = {
            let mut state = self.state.lock().await;
            let shots = state.scheduler.shots_called();
            let completed = state.timer.stop();
            state.monitor.clear();
            WorkoutRecord::new(completed, shots, self.settings.clone())
        };
        self.narrator.stop().await;
        self.forward(vec![Event::SessionStopped {
            record: record.clone(),
            at: Utc::now(),
        }]);
        record
    }

    /// The host lost sight of us (screen off, app backgrounded).
    pub async fn notify_hidden(&self) {
        let mut state = self.state.lock().await;
        state.monitor.on_lost(InterruptionReason::Hidden);
    }

    /// The audio device was taken by something else.
    pub async fn notify_audio_lost(&self) {
        let mut state = self.state.lock().await;
        state.monitor.on_lost(InterruptionReason::AudioFocusLost);
    }

    /// We are visible again. The interruption banner clears, but the
    /// session stays paused until the user resumes.
    pub async fn notify_visible(&self) {
        let cleared = {
            let mut state = self.state.lock().await;
            state.monitor.on_regained();
            state.monitor.clear()
        };
        if cleared {
            self.forward(vec![Event::InterruptionCleared { at: Utc::now() }]);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn forward(&self, events: Vec<Event>) {
        for event in events {
            let _ = self.events.send(event);
        }
    }

    fn spawn_tasks(&self) {
        // Subscribe before the start events go out so the tasks see them.
        let announcer_rx = self.subscribe();
        let callout_rx = self.subscribe();
        tokio::spawn(tick_loop(self.clone()));
        tokio::spawn(announcer_loop(self.clone(), announcer_rx));
        tokio::spawn(callout_loop(self.clone(), callout_rx));
    }

    fn utterance(&self, text: String) -> Utterance {
        Utterance::new(text)
            .with_voice(self.settings.voice.clone())
            .with_rate(self.settings.voice_speed)
    }
}

/// Drives the timer at 1 Hz and feeds the interruption monitor. Exits when
/// the session leaves its live phases.
async fn tick_loop(session: Session) {
    let start = tokio::time::Instant::now() + Duration::from_secs(1);
    let mut interval = tokio::time::interval_at(start, Duration::from_secs(1));
    loop {
        interval.tick().await;
        let (events, pause_narrator, live) = {
            let mut state = session.state.lock().await;
            let mut events = state.timer.tick();
            let mut pause_narrator = false;
            // Losing focus only matters mid-round; rest and pre-round
            // survive a backgrounded host on their own.
            if state.timer.phase() == Phase::Running && !state.timer.paused() {
                if let Some(interruption) = state.monitor.tick() {
                    if let Some(paused) = state.timer.force_pause() {
                        events.push(paused);
                        pause_narrator = true;
                    }
                    events.push(Event::InterruptionDetected {
                        reason: interruption.reason.to_string(),
                        at: Utc::now(),
                    });
                }
            }
            (events, pause_narrator, state.timer.is_live())
        };
        if pause_narrator {
            session.narrator.pause().await;
        }
        session.forward(events);
        if !live {
            break;
        }
    }
    debug!("tick loop finished");
}

/// Narrates phase changes. System announcements jump the callout queue.
async fn announcer_loop(session: Session, mut rx: broadcast::Receiver<Event>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "announcer lagged behind events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let (text, last) = match event {
            Event::PreRoundStarted { .. } => ("Get ready".to_string(), false),
            Event::RoundStarted { round, .. } => (format!("Round {round}"), false),
            Event::RestStarted { .. } => ("Rest".to_string(), false),
            Event::RestWarning { .. } => ("10 seconds".to_string(), false),
            Event::WorkoutCompleted { .. } => {
                ("That's the workout. Great work.".to_string(), true)
            }
            Event::SessionStopped { .. } => break,
            _ => continue,
        };
        if let Err(e) = session.narrator.speak_immediate(session.utterance(text)).await {
            match e {
                NarrationError::Interrupted | NarrationError::Closed => {}
                e => {
                    warn!(error = %e, "announcement failed");
                    session.forward(vec![Event::NarrationFailed {
                        message: e.to_string(),
                        at: Utc::now(),
                    }]);
                }
            }
        }
        if last {
            break;
        }
    }
}

/// Paces technique prompts. Each `RoundStarted` (or a resume that lands in
/// a round) opens a calling burst; within a burst the next delay comes from
/// the measured duration of the utterance that just finished.
async fn callout_loop(session: Session, mut rx: broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(Event::RoundStarted { .. }) | Ok(Event::SessionResumed { .. }) => {}
            Ok(Event::WorkoutCompleted { .. }) | Ok(Event::SessionStopped { .. }) => break,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }

        let mut delay_ms = {
            let state = session.state.lock().await;
            state.scheduler.initial_delay_ms()
        };
        loop {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            // Activation is re-checked now, at fire time, not when the
            // delay was scheduled.
            let text = {
                let mut state = session.state.lock().await;
                if !state.timer.callouts_active() {
                    break;
                }
                let State {
                    scheduler, rng, ..
                } = &mut *state;
                scheduler.next_callout(rng)
            };
            let Some(text) = text else { break };

            match session.narrator.speak(session.utterance(text.clone())).await {
                Ok(outcome) => {
                    session.forward(vec![Event::CalloutSpoken {
                        text,
                        duration_ms: outcome.duration_ms,
                        at: Utc::now(),
                    }]);
                    let mut state = session.state.lock().await;
                    let State {
                        scheduler, rng, ..
                    } = &mut *state;
                    delay_ms = scheduler.next_delay_ms(outcome.duration_ms, rng);
                }
                Err(NarrationError::Interrupted) => break,
                Err(NarrationError::Closed) => break,
                Err(e) => {
                    warn!(error = %e, "callout failed, session continues silent");
                    session.forward(vec![Event::NarrationFailed {
                        message: e.to_string(),
                        at: Utc::now(),
                    }]);
                    let state = session.state.lock().await;
                    delay_ms = state.scheduler.profile().base_delay_ms() as u64;
                }
            }
        }
    }
}
