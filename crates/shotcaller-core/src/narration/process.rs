//! Local synthesizer backend.
//!
//! Drives a speech command such as `espeak-ng` or macOS `say` as a child
//! process. One utterance is one process run; `speak` resolves when the
//! process exits, which is when audio playback ends, so the engine's
//! measured durations are accurate without any compensation model help.
//! Cancellation kills the child.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::NarrationError;

use super::backend::{BoxFuture, SpeechBackend, Utterance, VoiceInfo};

/// Nominal words-per-minute the rate multiplier scales from.
const BASE_WPM: f64 = 175.0;

#[derive(Debug)]
pub struct ProcessBackend {
    program: String,
    cancel: Notify,
}

impl ProcessBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cancel: Notify::new(),
        }
    }

    /// First speech command found on PATH, if any.
    pub fn detect() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        ["espeak-ng", "espeak", "say"]
            .iter()
            .find(|p| find_in_path(p, &path).is_some())
            .map(|p| Self::new(*p))
    }

    fn basename(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(&self.program)
    }

    fn build_args(&self, utterance: &Utterance) -> Vec<String> {
        let mut args = Vec::new();
        match self.basename() {
            "espeak-ng" | "espeak" => {
                let wpm = (BASE_WPM * utterance.rate).round().clamp(80.0, 450.0) as u32;
                args.push("-s".into());
                args.push(wpm.to_string());
                args.push("-a".into());
                args.push(((utterance.volume * 100.0).round() as u32).min(200).to_string());
                if let Some(voice) = &utterance.voice {
                    args.push("-v".into());
                    args.push(voice.clone());
                }
            }
            "say" => {
                let wpm = (BASE_WPM * utterance.rate).round() as u32;
                args.push("-r".into());
                args.push(wpm.to_string());
                if let Some(voice) = &utterance.voice {
                    args.push("-v".into());
                    args.push(voice.clone());
                }
            }
            _ => {}
        }
        args.push(utterance.text.clone());
        args
    }
}

impl SpeechBackend for ProcessBackend {
    fn name(&self) -> &'static str {
        "process"
    }

    fn is_available(&self) -> bool {
        let program = Path::new(&self.program);
        if program.is_absolute() {
            return program.is_file();
        }
        std::env::var_os("PATH")
            .map(|path| find_in_path(&self.program, &path).is_some())
            .unwrap_or(false)
    }

    fn is_fast_engine(&self) -> bool {
        // espeak renders noticeably quicker than natural voices at the
        // same nominal rate.
        matches!(self.basename(), "espeak-ng" | "espeak")
    }

    fn voices(&self) -> BoxFuture<'_, Result<Vec<VoiceInfo>, NarrationError>> {
        Box::pin(async move {
            match self.basename() {
                "espeak-ng" | "espeak" => {
                    let output = Command::new(&self.program)
                        .arg("--voices")
                        .stdin(Stdio::null())
                        .output()
                        .await
                        .map_err(NarrationError::Io)?;
                    Ok(parse_espeak_voices(&String::from_utf8_lossy(&output.stdout)))
                }
                _ => Ok(Vec::new()),
            }
        })
    }

    fn speak<'a>(&'a self, utterance: &'a Utterance) -> BoxFuture<'a, Result<(), NarrationError>> {
        Box::pin(async move {
            let args = self.build_args(utterance);
            debug!(program = %self.program, "spawning synthesizer");
            let mut child = Command::new(&self.program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(NarrationError::Io)?;

            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(NarrationError::Io)?;
                    if status.success() {
                        Ok(())
                    } else {
                        Err(NarrationError::Backend {
                            backend: "process".into(),
                            message: format!("synthesizer exited with {status}"),
                        })
                    }
                }
                _ = self.cancel.notified() => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    Err(NarrationError::Interrupted)
                }
            }
        })
    }

    fn cancel(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {
            self.cancel.notify_waiters();
        })
    }
}

fn find_in_path(program: &str, path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Parse `espeak-ng --voices` tabular output.
fn parse_espeak_voices(raw: &str) -> Vec<VoiceInfo> {
    raw.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            Some(VoiceInfo {
                id: cols[3].to_string(),
                name: cols[3].to_string(),
                language: cols[1].to_string(),
                is_default: false,
            })
        })
        .collect()
}
