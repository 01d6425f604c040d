//! Speech server backend.
//!
//! Talks to a local speech daemon that synthesizes and plays audio on the
//! host. The speak request returns only after playback finishes, which is
//! what the narration engine's duration measurement relies on.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NarrationError;

use super::backend::{BoxFuture, SpeechBackend, Utterance, VoiceInfo};

/// Ceiling on one synthesis-plus-playback request.
const SPEAK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    speed: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceInfo>,
}

#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Check whether the daemon answers at all.
    pub async fn probe(&self) -> bool {
        self.client
            .get(format!("{}/v1/audio/voices", self.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

impl SpeechBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn is_available(&self) -> bool {
        // Reachability is only knowable per request; a configured URL is
        // treated as available and failures surface from speak itself.
        !self.base_url.is_empty()
    }

    fn voices(&self) -> BoxFuture<'_, Result<Vec<VoiceInfo>, NarrationError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/v1/audio/voices", self.base_url))
                .send()
                .await?
                .error_for_status()?;
            let body: VoicesResponse = response.json().await?;
            Ok(body.voices)
        })
    }

    fn speak<'a>(&'a self, utterance: &'a Utterance) -> BoxFuture<'a, Result<(), NarrationError>> {
        Box::pin(async move {
            let request = SpeakRequest {
                input: &utterance.text,
                voice: utterance.voice.as_deref(),
                speed: utterance.rate,
                volume: utterance.volume,
            };
            debug!(url = %self.base_url, "posting speech request");
            let response = self
                .client
                .post(format!("{}/v1/audio/speech", self.base_url))
                .timeout(SPEAK_TIMEOUT)
                .json(&request)
                .send()
                .await?;
            match response.status() {
                status if status.is_success() => Ok(()),
                // The daemon answers 409 for a request it dropped on stop.
                StatusCode::CONFLICT => Err(NarrationError::Interrupted),
                status => Err(NarrationError::Backend {
                    backend: "http".into(),
                    message: format!("speech server returned {status}"),
                }),
            }
        })
    }

    fn cancel(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let result = self
                .client
                .post(format!("{}/v1/audio/stop", self.base_url))
                .timeout(Duration::from_secs(2))
                .send()
                .await;
            if let Err(e) = result {
                debug!(error = %e, "speech server stop failed");
            }
        })
    }
}
