//! # Shotcaller Core Library
//!
//! Core logic for a voice-driven combat sports round timer: it runs the
//! round/rest clock, builds a technique pool from the selected styles, and
//! narrates technique callouts at a difficulty-dependent cadence. The CLI
//! binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven state machine; the orchestrator calls
//!   `tick()` once per second and forwards the returned events
//! - **Scheduler**: picks the next callout and paces it from the measured
//!   duration of the previous one
//! - **Narration**: a single-flight speech queue over pluggable backends
//!   (local synthesizer process or speech server)
//! - **Session**: the async orchestrator tying the above together behind a
//!   broadcast event channel
//!
//! ## Key Components
//!
//! - [`Session`]: one training session from start to stop
//! - [`SessionTimer`]: the round/rest clock
//! - [`Narrator`]: the speech engine
//! - [`Config`]: TOML-backed application configuration

pub mod error;
pub mod events;
pub mod interruption;
pub mod mirror;
pub mod narration;
pub mod pool;
pub mod record;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod techniques;
pub mod timer;

pub use error::{ConfigError, CoreError, NarrationError, SessionError};
pub use events::Event;
pub use interruption::{InterruptionMonitor, InterruptionReason, InterruptionState};
pub use narration::{
    backend_from_config, HttpBackend, Narrator, NullBackend, ProcessBackend, SpeechBackend,
    Utterance, VoiceInfo,
};
pub use pool::{PoolBuilder, TechniqueEntry, TechniquePool};
pub use record::WorkoutRecord;
pub use scheduler::{CadenceProfile, CalloutScheduler};
pub use session::{Session, SessionSnapshot};
pub use settings::{Config, Difficulty, SessionSettings};
pub use techniques::{
    builtin, style_catalog, StyleInfo, TechniqueGroup, TechniqueItem, TechniqueLibrary,
};
pub use timer::{Phase, SessionTimer, TimerParams};
