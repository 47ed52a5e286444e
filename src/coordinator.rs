use crate::{
    common::frame::Frame,
    config::EngineConfig,
    error::AppError,
    pipeline::{
        context::FrameContext,
        domain::{FrameInput, Observation, RegionTransform},
        engine::ArbitrationEngine,
        services::{
            BoxError, BoxedClassifier, Classifier, ClassifierBuilder, EngineSnapshot,
            IngredientLookup, LoggingSpeech, OverlaySink, SpeechChannel, resolve_observation,
        },
    },
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, error, info, warn};

/// Counters reported by a running coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub frames_processed: u64,
    /// Frames replaced by a newer one before the worker picked them up
    pub frames_skipped: u64,
    pub classifier_failures: u64,
    pub utterances: u64,
}

#[derive(Default)]
struct StatsCounters {
    frames_processed: AtomicU64,
    frames_skipped: AtomicU64,
    classifier_failures: AtomicU64,
    utterances: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            utterances: self.utterances.load(Ordering::Relaxed),
        }
    }
}

/// Runs the arbitration engine on a single worker task.
///
/// Frames are handed over through a watch channel, so a frame submitted
/// while another is being classified replaces any frame still waiting.
pub struct Coordinator {
    worker_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    frame_tx: Option<watch::Sender<Option<Frame>>>,
    snapshot_rx: watch::Receiver<EngineSnapshot>,
    stats: Arc<StatsCounters>,
}

impl Coordinator {
    fn new(worker: Worker, snapshot_rx: watch::Receiver<EngineSnapshot>) -> Self {
        let cancel_token = CancellationToken::new();
        let (frame_tx, frame_rx) = watch::channel(None);
        let stats = worker.stats.clone();

        Self {
            worker_task: Some(Self::start_worker_task(worker, frame_rx, cancel_token.clone())),
            cancel_token,
            frame_tx: Some(frame_tx),
            snapshot_rx,
            stats,
        }
    }

    fn start_worker_task(
        mut worker: Worker,
        mut frame_rx: watch::Receiver<Option<Frame>>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Arbitration worker started");
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    changed = frame_rx.changed() => {
                        if changed.is_err() {
                            debug!("Frame source closed");
                            break;
                        }
                    }
                }

                let pending = frame_rx.borrow_and_update().clone();
                let Some(frame) = pending else {
                    continue;
                };
                if !worker.handle_frame(frame, &cancel_token).await {
                    break;
                }
            }
            info!("Arbitration worker stopped");
        })
    }

    /// Hand a frame to the worker, replacing any frame it has not picked up yet.
    pub fn submit(&self, frame: Frame) {
        if let Some(frame_tx) = &self.frame_tx {
            frame_tx.send_replace(Some(frame));
        }
    }

    /// Snapshots published after every processed frame.
    pub fn snapshots(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats.snapshot()
    }

    /// Close the frame source, let the worker finish the pending frame and wait for it.
    pub async fn drain(mut self) -> CoordinatorStats {
        self.frame_tx.take();
        if let Some(worker_task) = self.worker_task.take() {
            if let Err(e) = worker_task.await {
                error!("Arbitration worker failed: {}", e);
            }
        }
        self.stats()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the worker task owns. Engine state never leaves this task.
struct Worker {
    engine: ArbitrationEngine,
    classifier: BoxedClassifier,
    lookup: Option<Arc<dyn IngredientLookup>>,
    speech: Arc<dyn SpeechChannel>,
    overlay: Option<Arc<dyn OverlaySink>>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    stats: Arc<StatsCounters>,
    last_sequence: Option<u64>,
}

impl Worker {
    /// Returns false once cancellation is observed.
    async fn handle_frame(&mut self, frame: Frame, cancel_token: &CancellationToken) -> bool {
        let sequence = frame.sequence();
        if let Some(last) = self.last_sequence {
            let skipped = sequence.saturating_sub(last).saturating_sub(1);
            if skipped > 0 {
                debug!("Skipped {} stale frame(s) before frame {}", skipped, sequence);
                self.stats.frames_skipped.fetch_add(skipped, Ordering::Relaxed);
            }
        }
        self.last_sequence = Some(sequence);

        let classified = tokio::select! {
            _ = cancel_token.cancelled() => return false,
            result = classify(&mut self.classifier, frame.clone()) => result,
        };

        let input = match classified {
            Ok(observation) => {
                let lookup = self.lookup.as_deref();
                tokio::select! {
                    _ = cancel_token.cancelled() => return false,
                    input = resolve_observation(observation, lookup) => input,
                }
            }
            Err(e) => {
                warn!("Classifier failed on frame {}: {}", sequence, e);
                self.stats.classifier_failures.fetch_add(1, Ordering::Relaxed);
                FrameInput::empty()
            }
        };

        if cancel_token.is_cancelled() {
            return false;
        }

        let context = self.engine.process(FrameContext::new(frame, input));
        let snapshot = self.engine.snapshot(&context);
        debug!(
            "Frame {} processed in {:?} ({:?} in engine)",
            sequence,
            context.elapsed(),
            context.metrics().total()
        );

        if let Some(utterance) = context.into_utterance() {
            match self.speech.speak(utterance) {
                Ok(()) => {
                    self.stats.utterances.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => warn!("{} dropped an utterance: {}", self.speech.name(), e),
            }
        }

        if let Some(overlay) = &self.overlay {
            overlay.overlay(&snapshot.candidate_regions);
        }
        self.stats.frames_processed.fetch_add(1, Ordering::Relaxed);
        self.snapshot_tx.send_replace(snapshot);
        true
    }
}

async fn classify(classifier: &mut BoxedClassifier, frame: Frame) -> Result<Observation, BoxError> {
    classifier.ready().await?.call(frame).await
}

pub struct CoordinatorBuilder {
    config: EngineConfig,
    classifier: Option<Arc<dyn Classifier>>,
    transform: Option<RegionTransform>,
    lookup: Option<Arc<dyn IngredientLookup>>,
    speech: Option<Arc<dyn SpeechChannel>>,
    overlay: Option<Arc<dyn OverlaySink>>,
}

impl CoordinatorBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            classifier: None,
            transform: None,
            lookup: None,
            speech: None,
            overlay: None,
        }
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    // Rescales every detection from model space before it reaches the engine.
    pub fn transform(mut self, transform: RegionTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn lookup(mut self, lookup: Arc<dyn IngredientLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    // Defaults to logging utterances when not set.
    pub fn speech(mut self, speech: Arc<dyn SpeechChannel>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn overlay(mut self, overlay: Arc<dyn OverlaySink>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        let classifier = self
            .classifier
            .ok_or(AppError::Pipeline("Classifier not set".to_string()))?;
        let timeout = self.config.classifier_timeout();
        let engine = ArbitrationEngine::new(self.config)?;

        let mut classifier_builder = ClassifierBuilder::new(classifier.clone()).timeout(timeout);
        if let Some(transform) = self.transform {
            classifier_builder = classifier_builder.transform(transform);
        }
        let speech = self.speech.unwrap_or_else(|| Arc::new(LoggingSpeech));
        info!(
            "Starting coordinator with {} classifier and {} output",
            classifier.name(),
            speech.name()
        );

        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());
        let worker = Worker {
            engine,
            classifier: classifier_builder.build(),
            lookup: self.lookup,
            speech,
            overlay: self.overlay,
            snapshot_tx,
            stats: Arc::new(StatsCounters::default()),
            last_sequence: None,
        };
        Ok(Coordinator::new(worker, snapshot_rx))
    }
}
