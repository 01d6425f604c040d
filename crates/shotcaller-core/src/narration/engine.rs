//! Single-flight narration engine.
//!
//! At most one utterance is ever in flight; everything else waits in FIFO
//! order in a queue drained by a worker task. `speak` resolves when its
//! request has actually finished speaking and reports the measured
//! duration, which is what the callout scheduler's feedback loop runs on.
//!
//! Some engines signal "done" before audio playback really ends, so the
//! reported duration is `max(measured, expected)` where the expected time
//! comes from a word-count model. Under-counting speech time causes
//! audible callout overlap; the compensation is mandatory. The model
//! constants are injectable because they need recalibration per backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::NarrationError;

use super::backend::{SpeechBackend, Utterance, VoiceInfo};

/// Pause the worker takes before speaking a `speak_immediate` request,
/// letting the backend settle after the cancel.
const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Minimum-duration policy: approximates how long `text` should take to
/// speak so a backend's early "done" signal cannot under-report.
#[derive(Debug, Clone, Copy)]
pub struct DurationModel {
    /// Average characters per spoken word.
    pub chars_per_word: f64,
    /// Milliseconds per word at rate 1.0.
    pub ms_per_word: f64,
    /// Multiplier applied to rates above 1.0 on fast engines.
    pub fast_engine_scale: f64,
}

impl Default for DurationModel {
    fn default() -> Self {
        Self {
            chars_per_word: 5.0,
            ms_per_word: 400.0,
            fast_engine_scale: 0.85,
        }
    }
}

impl DurationModel {
    /// Expected speaking time for `text` at `rate`.
    pub fn expected_ms(&self, text: &str, rate: f64) -> u64 {
        let words = (text.chars().count() as f64 / self.chars_per_word).ceil().max(1.0);
        let rate = rate.max(0.1);
        (words * self.ms_per_word / rate) as u64
    }

    /// Normalize a nominal rate for the given backend so one user-facing
    /// speed setting feels comparable across engines. The scale only
    /// applies above the 1.0 baseline.
    pub fn effective_rate(&self, rate: f64, fast_engine: bool) -> f64 {
        if fast_engine && rate > 1.0 {
            1.0 + (rate - 1.0) * self.fast_engine_scale
        } else {
            rate
        }
    }
}

/// What a finished utterance reports back.
#[derive(Debug, Clone, Copy)]
pub struct SpokenOutcome {
    /// `max(measured, expected)` speaking time.
    pub duration_ms: u64,
}

struct Job {
    utterance: Utterance,
    generation: u64,
    /// System announcements wait out `SETTLE_DELAY` before speaking.
    settle: bool,
    done: oneshot::Sender<Result<SpokenOutcome, NarrationError>>,
}

struct Shared {
    /// Jobs with an older generation are flushed without speaking.
    generation: AtomicU64,
    speaking: AtomicBool,
    /// Jobs ever handed to the queue; compared against the worker's
    /// completion count by `wait_idle`.
    submitted: AtomicU64,
}

/// The narration engine. Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct Narrator {
    backend: Arc<dyn SpeechBackend>,
    tx: mpsc::UnboundedSender<Job>,
    paused: watch::Sender<bool>,
    completed: watch::Receiver<u64>,
    shared: Arc<Shared>,
}

impl Narrator {
    /// Construct the engine and spawn its worker task on the current
    /// runtime. Dropping every clone shuts the worker down.
    pub fn new(backend: Arc<dyn SpeechBackend>, model: DurationModel) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (paused, paused_rx) = watch::channel(false);
        let (completed_tx, completed) = watch::channel(0u64);
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            speaking: AtomicBool::new(false),
            submitted: AtomicU64::new(0),
        });
        tokio::spawn(worker(
            Arc::clone(&backend),
            model,
            rx,
            paused_rx,
            completed_tx,
            Arc::clone(&shared),
        ));
        Self {
            backend,
            tx,
            paused,
            completed,
            shared,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::Acquire)
    }

    pub async fn voices(&self) -> Result<Vec<VoiceInfo>, NarrationError> {
        self.backend.voices().await
    }

    /// Queue an utterance and wait for it to finish speaking.
    pub async fn speak(&self, utterance: Utterance) -> Result<SpokenOutcome, NarrationError> {
        let generation = self.shared.generation.load(Ordering::Acquire);
        self.enqueue(utterance, generation, false)?.await
    }

    /// Bypass the queue for a system announcement: cancel the in-flight
    /// utterance and flush everything waiting; the worker settles briefly,
    /// then speaks. Queued `speak` calls resolve with `Interrupted`. The
    /// queue slot is claimed before the first await, so a `speak` racing
    /// this call cannot slot in ahead of the announcement.
    pub async fn speak_immediate(
        &self,
        utterance: Utterance,
    ) -> Result<SpokenOutcome, NarrationError> {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let pending = self.enqueue(utterance, generation, true)?;
        self.backend.cancel().await;
        pending.await
    }

    /// Resolve once every utterance handed to the queue so far has finished
    /// speaking or been flushed.
    pub async fn wait_idle(&self) {
        let mut completed = self.completed.clone();
        loop {
            let done = *completed.borrow_and_update();
            if done >= self.shared.submitted.load(Ordering::Acquire) {
                return;
            }
            if completed.changed().await.is_err() {
                return;
            }
        }
    }

    /// Issue the near-silent unlock primer. Synchronous by contract: the
    /// request must be enqueued in the same call stack as the user's start
    /// action, before any await point.
    pub fn prime(&self, rate: f64) {
        let utterance = Utterance::new(" ").with_rate(rate.max(1.0)).with_volume(0.0);
        let generation = self.shared.generation.load(Ordering::Acquire);
        if let Ok(rx) = self.enqueue(utterance, generation, false) {
            // Completion is nobody's business; drop the receiver.
            drop(rx);
        }
    }

    /// Cancel the in-flight utterance and flush the queue. The engine
    /// stays usable for later requests.
    pub async fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.backend.cancel().await;
    }

    /// Hold the queue and cancel the in-flight utterance. A cancelled
    /// utterance is not replayed on resume; synthesizer processes cannot
    /// restart mid-sentence.
    pub async fn pause(&self) {
        let _ = self.paused.send(true);
        self.backend.cancel().await;
    }

    /// Release a paused queue.
    pub fn resume(&self) {
        let _ = self.paused.send(false);
    }

    fn enqueue(
        &self,
        utterance: Utterance,
        generation: u64,
        settle: bool,
    ) -> Result<
        impl std::future::Future<Output = Result<SpokenOutcome, NarrationError>>,
        NarrationError,
    > {
        let (done_tx, done_rx) = oneshot::channel();
        // Counted before the send so the worker can never complete a job
        // `wait_idle` has not yet seen submitted.
        self.shared.submitted.fetch_add(1, Ordering::AcqRel);
        let sent = self.tx.send(Job {
            utterance,
            generation,
            settle,
            done: done_tx,
        });
        if sent.is_err() {
            self.shared.submitted.fetch_sub(1, Ordering::AcqRel);
            return Err(NarrationError::Closed);
        }
        Ok(async move { done_rx.await.map_err(|_| NarrationError::Closed)? })
    }
}

async fn worker(
    backend: Arc<dyn SpeechBackend>,
    model: DurationModel,
    mut rx: mpsc::UnboundedReceiver<Job>,
    mut paused: watch::Receiver<bool>,
    completed: watch::Sender<u64>,
    shared: Arc<Shared>,
) {
    while let Some(job) = rx.recv().await {
        if job.generation < shared.generation.load(Ordering::Acquire) {
            let _ = job.done.send(Err(NarrationError::Interrupted));
            completed.send_modify(|n| *n += 1);
            continue;
        }
        while *paused.borrow() {
            if paused.changed().await.is_err() {
                return;
            }
        }
        // A flush may have happened while we were held.
        if job.generation < shared.generation.load(Ordering::Acquire) {
            let _ = job.done.send(Err(NarrationError::Interrupted));
            completed.send_modify(|n| *n += 1);
            continue;
        }
        if job.settle {
            tokio::time::sleep(SETTLE_DELAY).await;
            // A newer announcement may have superseded this one.
            if job.generation < shared.generation.load(Ordering::Acquire) {
                let _ = job.done.send(Err(NarrationError::Interrupted));
                completed.send_modify(|n| *n += 1);
                continue;
            }
        }

        let mut utterance = job.utterance;
        utterance.rate = model.effective_rate(utterance.rate, backend.is_fast_engine());

        shared.speaking.store(true, Ordering::Release);
        let started = Instant::now();
        let result = backend.speak(&utterance).await;
        shared.speaking.store(false, Ordering::Release);

        let outcome = match result {
            Ok(()) => {
                let measured = started.elapsed().as_millis() as u64;
                let expected = model.expected_ms(&utterance.text, utterance.rate);
                if measured < expected {
                    debug!(measured, expected, "backend under-reported duration");
                }
                Ok(SpokenOutcome {
                    duration_ms: measured.max(expected),
                })
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "utterance failed");
                Err(e)
            }
        };
        let _ = job.done.send(outcome);
        completed.send_modify(|n| *n += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::backend::BoxFuture;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Scripted backend: each utterance "plays" for a fixed duration on
    /// the paused test clock and records its start order.
    struct FakeBackend {
        play_ms: u64,
        log: Mutex<Vec<String>>,
        cancelled: Notify,
        in_flight: AtomicBool,
    }

    impl FakeBackend {
        fn new(play_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                play_ms,
                log: Mutex::new(Vec::new()),
                cancelled: Notify::new(),
                in_flight: AtomicBool::new(false),
            })
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl SpeechBackend for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn voices(&self) -> BoxFuture<'_, Result<Vec<VoiceInfo>, NarrationError>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn speak<'a>(
            &'a self,
            utterance: &'a Utterance,
        ) -> BoxFuture<'a, Result<(), NarrationError>> {
            Box::pin(async move {
                assert!(
                    !self.in_flight.swap(true, Ordering::AcqRel),
                    "two utterances in flight"
                );
                self.log.lock().unwrap().push(utterance.text.clone());
                let result = tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(self.play_ms)) => Ok(()),
                    _ = self.cancelled.notified() => Err(NarrationError::Interrupted),
                };
                self.in_flight.store(false, Ordering::Release);
                result
            })
        }

        fn cancel(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {
                self.cancelled.notify_waiters();
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn five_rapid_speaks_run_sequentially() {
        let backend = FakeBackend::new(500);
        let narrator = Narrator::new(backend.clone(), DurationModel::default());

        let mut handles = Vec::new();
        for i in 0..5 {
            let n = narrator.clone();
            handles.push(tokio::spawn(async move {
                n.speak(Utterance::new(format!("callout {i}"))).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(
            backend.log(),
            vec!["callout 0", "callout 1", "callout 2", "callout 3", "callout 4"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duration_is_at_least_expected() {
        // Backend claims it finished instantly; the model floor wins.
        let backend = FakeBackend::new(0);
        let narrator = Narrator::new(backend, DurationModel::default());

        let long_text = "Jab, Cross, Left Hook, Right Low Kick";
        let outcome = narrator.speak(Utterance::new(long_text)).await.unwrap();
        let expected = DurationModel::default().expected_ms(long_text, 1.0);
        assert!(outcome.duration_ms >= expected);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_immediate_flushes_queue() {
        let backend = FakeBackend::new(1_000);
        let narrator = Narrator::new(backend.clone(), DurationModel::default());

        let n1 = narrator.clone();
        let first = tokio::spawn(async move { n1.speak(Utterance::new("first")).await });
        let n2 = narrator.clone();
        let queued = tokio::spawn(async move { n2.speak(Utterance::new("queued")).await });
        // Let "first" start and "queued" enter the queue.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = narrator
            .speak_immediate(Utterance::new("get ready"))
            .await
            .unwrap();
        assert!(outcome.duration_ms >= 1_000);

        assert!(matches!(
            first.await.unwrap(),
            Err(NarrationError::Interrupted)
        ));
        assert!(matches!(
            queued.await.unwrap(),
            Err(NarrationError::Interrupted)
        ));
        assert_eq!(backend.log(), vec!["first", "get ready"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_holds_queue_until_resume() {
        let backend = FakeBackend::new(200);
        let narrator = Narrator::new(backend.clone(), DurationModel::default());

        narrator.pause().await;
        let n = narrator.clone();
        let pending = tokio::spawn(async move { n.speak(Utterance::new("held")).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(backend.log().is_empty());

        narrator.resume();
        pending.await.unwrap().unwrap();
        assert_eq!(backend.log(), vec!["held"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_engine_rate_scaled_above_baseline() {
        let model = DurationModel::default();
        assert_eq!(model.effective_rate(1.0, true), 1.0);
        assert_eq!(model.effective_rate(0.9, true), 0.9);
        assert!(model.effective_rate(2.0, true) < 2.0);
        assert_eq!(model.effective_rate(2.0, false), 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn announcement_beats_a_callout_racing_its_settle() {
        let backend = FakeBackend::new(200);
        let narrator = Narrator::new(backend.clone(), DurationModel::default());

        let n = narrator.clone();
        let announce =
            tokio::spawn(async move { n.speak_immediate(Utterance::new("halfway")).await });
        // Land a callout inside the announcement's settle window.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let n = narrator.clone();
        let callout = tokio::spawn(async move { n.speak(Utterance::new("jab")).await });

        announce.await.unwrap().unwrap();
        callout.await.unwrap().unwrap();
        assert_eq!(backend.log(), vec!["halfway", "jab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_resolves_after_the_queue_drains() {
        let backend = FakeBackend::new(400);
        let narrator = Narrator::new(backend.clone(), DurationModel::default());

        let mut handles = Vec::new();
        for i in 0..3 {
            let n = narrator.clone();
            handles.push(tokio::spawn(async move {
                n.speak(Utterance::new(format!("hit {i}"))).await
            }));
        }
        // Let the speaks land in the queue before waiting on it.
        tokio::time::sleep(Duration::from_millis(1)).await;

        narrator.wait_idle().await;
        assert_eq!(backend.log().len(), 3);
        assert!(!narrator.is_speaking());
        for h in handles {
            h.await.unwrap().unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prime_enqueues_silent_utterance() {
        let backend = FakeBackend::new(10);
        let narrator = Narrator::new(backend.clone(), DurationModel::default());
        narrator.prime(1.0);
        // Follow-up speak lands after the primer.
        narrator.speak(Utterance::new("next")).await.unwrap();
        assert_eq!(backend.log(), vec![" ", "next"]);
    }
}
