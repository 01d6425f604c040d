//! Speech narration: backends and the single-flight engine.

mod backend;
mod engine;
mod http;
mod process;

pub use backend::{BoxFuture, NullBackend, SpeechBackend, Utterance, VoiceInfo};
pub use engine::{DurationModel, Narrator, SpokenOutcome};
pub use http::HttpBackend;
pub use process::ProcessBackend;

use std::sync::Arc;

use tracing::info;

use crate::settings::Config;

/// Pick a speech backend from configuration: an explicit server or command
/// wins, otherwise scan for a known synthesizer. Falls back to the silent
/// backend so a session can still run as a plain timer.
pub fn backend_from_config(config: &Config) -> Arc<dyn SpeechBackend> {
    if let Some(url) = &config.speech_server {
        info!(url = %url, "using speech server backend");
        return Arc::new(HttpBackend::new(url.clone()));
    }
    if let Some(command) = &config.speech_command {
        info!(command = %command, "using synthesizer command backend");
        return Arc::new(ProcessBackend::new(command.clone()));
    }
    match ProcessBackend::detect() {
        Some(backend) => {
            info!("detected local synthesizer");
            Arc::new(backend)
        }
        None => {
            info!("no speech backend found, narration disabled");
            Arc::new(NullBackend)
        }
    }
}
