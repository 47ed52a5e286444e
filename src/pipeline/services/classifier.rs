use crate::common::Frame;
use crate::error::AppError;
use crate::pipeline::domain::{Observation, RegionTransform};
use async_trait::async_trait;
use futures::Future;
use futures::task::{Context, Poll};
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::Service;
use tracing::debug;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The classifier as the worker sees it: an async call per frame, boxed with its middleware.
pub type BoxedClassifier = BoxService<Frame, Observation, BoxError>;

/// Black-box producer of per-frame detections or recognized text.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<Observation, AppError>;

    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct ClassifierService {
    inner: Arc<dyn Classifier>,
    transform: Option<RegionTransform>,
}

impl ClassifierService {
    pub fn new(inner: Arc<dyn Classifier>) -> Self {
        Self {
            inner,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: RegionTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

impl Service<Frame> for ClassifierService {
    type Response = Observation;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: Frame) -> Self::Future {
        let inner = self.inner.clone();
        let transform = self.transform;
        let (width, height) = frame.dimensions();
        debug!(
            "Classifying frame {} ({}x{}, {} bytes)",
            frame.sequence(),
            width,
            height,
            frame.pixels().len()
        );

        Box::pin(async move {
            let observation = inner.classify(&frame).await?;
            Ok::<_, BoxError>(match (observation, transform) {
                (Observation::Detections(detections), Some(transform)) => Observation::Detections(
                    detections
                        .iter()
                        .map(|detection| detection.transformed(&transform))
                        .collect(),
                ),
                (observation, _) => observation,
            })
        })
    }
}

pub struct ClassifierBuilder {
    classifier: Arc<dyn Classifier>,
    timeout: Option<Duration>,
    transform: Option<RegionTransform>,
}

impl ClassifierBuilder {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            timeout: None,
            transform: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transform(mut self, transform: RegionTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn build(self) -> BoxedClassifier {
        let mut service = ClassifierService::new(self.classifier);
        if let Some(transform) = self.transform {
            service = service.with_transform(transform);
        }
        let service = ServiceBuilder::new()
            .option_layer(self.timeout.map(TimeoutLayer::new))
            .service(service);
        BoxService::new(service)
    }
}

/// Replays canned observations keyed by frame sequence (for replay and testing)
#[derive(Default)]
pub struct ScriptedClassifier {
    observations: HashMap<u64, Observation>,
    failing: HashSet<u64>,
    delay: Option<Duration>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observation(mut self, sequence: u64, observation: Observation) -> Self {
        self.observations.insert(sequence, observation);
        self
    }

    pub fn with_failure(mut self, sequence: u64) -> Self {
        self.failing.insert(sequence);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, frame: &Frame) -> Result<Observation, AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&frame.sequence()) {
            return Err(AppError::Classifier(format!(
                "scripted failure for frame {}",
                frame.sequence()
            )));
        }
        Ok(self
            .observations
            .get(&frame.sequence())
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "ScriptedClassifier"
    }
}
