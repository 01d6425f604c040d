//! Speech backend abstraction.
//!
//! Two interchangeable backends sit behind this trait: a local synthesizer
//! process and a speech-server HTTP client. Methods return boxed futures so
//! the trait stays object-safe and the engine can hold a `dyn` backend.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::NarrationError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One voice a backend can speak with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub language: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A single narration request as handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Backend voice identifier; `None` means the backend default.
    pub voice: Option<String>,
    /// Nominal speaking rate, 1.0 = normal.
    pub rate: f64,
    /// 0.0..=1.0; 0.0 is used for the unlock primer.
    pub volume: f64,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            rate: 1.0,
            volume: 1.0,
        }
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

/// A speech synthesis backend.
///
/// `speak` resolves when audio playback has finished (or the utterance was
/// cancelled); the engine measures the elapsed time around it.
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this backend can produce audio on this host at all.
    fn is_available(&self) -> bool;

    /// Backends whose engines run hot at the same nominal rate; the
    /// duration model scales their effective rate down above 1.0.
    fn is_fast_engine(&self) -> bool {
        false
    }

    fn voices(&self) -> BoxFuture<'_, Result<Vec<VoiceInfo>, NarrationError>>;

    fn speak<'a>(&'a self, utterance: &'a Utterance) -> BoxFuture<'a, Result<(), NarrationError>>;

    /// Cancel the in-flight utterance, if any. Must be safe to call when
    /// nothing is speaking.
    fn cancel(&self) -> BoxFuture<'_, ()>;
}

/// Backend that produces no audio. Stands in when no synthesizer exists so
/// a session degrades to a silent, timer-only workout.
#[derive(Debug, Default)]
pub struct NullBackend;

impl SpeechBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> BoxFuture<'_, Result<Vec<VoiceInfo>, NarrationError>> {
        Box::pin(async { Err(NarrationError::Unavailable) })
    }

    fn speak<'a>(&'a self, _utterance: &'a Utterance) -> BoxFuture<'a, Result<(), NarrationError>> {
        Box::pin(async { Ok(()) })
    }

    fn cancel(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_backend_speaks_silently_but_has_no_voices() {
        let backend = NullBackend;
        assert!(!backend.is_available());
        backend.speak(&Utterance::new("Jab")).await.unwrap();
        assert!(matches!(
            backend.voices().await,
            Err(NarrationError::Unavailable)
        ));
    }
}
