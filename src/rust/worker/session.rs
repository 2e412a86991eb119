use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use log::{debug, error, info, warn};

use super::protocol::{WorkerMessage, WorkerRequest};
use crate::classifier::{ClassificationResult, PipelineError, TextClassificationPipeline};
use crate::loader::{ModelLoader, PipelineFactory};
use crate::progress::{LoadEvent, ProgressCallback};

/// Loading state of a worker session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WorkerLoadState {
    Uninitialized = 0,
    Loading = 1,
    Ready = 2,
}

impl WorkerLoadState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerLoadState::Uninitialized,
            1 => WorkerLoadState::Loading,
            _ => WorkerLoadState::Ready,
        }
    }
}

/// Turns loader events into outbound messages while advancing the load state.
struct LoadTracker {
    state: AtomicU8,
    outbound: UnboundedSender<WorkerMessage>,
}

impl LoadTracker {
    fn state(&self) -> WorkerLoadState {
        WorkerLoadState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Moves to `next` unless already there or beyond. Returns whether it moved.
    fn advance(&self, next: WorkerLoadState) -> bool {
        self.state.fetch_max(next as u8, Ordering::SeqCst) < next as u8
    }

    fn observe(&self, event: LoadEvent) {
        let message = match event {
            LoadEvent::Initiate { model } => self
                .advance(WorkerLoadState::Loading)
                .then(|| WorkerMessage::Initiate { model }),
            LoadEvent::File(progress) => {
                (self.state() != WorkerLoadState::Ready).then(|| WorkerMessage::Progress(progress))
            }
            LoadEvent::Ready { model } => self
                .advance(WorkerLoadState::Ready)
                .then(|| WorkerMessage::Ready { model }),
        };
        if let Some(message) = message {
            if self.outbound.send(message).is_err() {
                debug!("Dropping load event, orchestrator is gone");
            }
        }
    }
}

/// The background actor that owns loading and inference.
///
/// A session handles one request at a time: every item is normalized and
/// classified in order before a single `Complete` (or `Error`) message is sent.
pub struct WorkerSession<F: PipelineFactory> {
    loader: Arc<ModelLoader<F>>,
    max_length: usize,
    pad_id: Option<u32>,
    tracker: Arc<LoadTracker>,
}

impl<F: PipelineFactory> WorkerSession<F> {
    pub fn new(
        loader: Arc<ModelLoader<F>>,
        max_length: usize,
        outbound: UnboundedSender<WorkerMessage>,
    ) -> Self {
        Self {
            loader,
            max_length,
            pad_id: None,
            tracker: Arc::new(LoadTracker {
                state: AtomicU8::new(WorkerLoadState::Uninitialized as u8),
                outbound,
            }),
        }
    }

    pub fn load_state(&self) -> WorkerLoadState {
        self.tracker.state()
    }

    /// Pad id discovered on the first classified item.
    pub fn pad_id(&self) -> Option<u32> {
        self.pad_id
    }

    /// Serves requests until the request channel closes or the orchestrator hangs up.
    pub async fn run(mut self, mut requests: UnboundedReceiver<WorkerRequest>) {
        info!("Worker session started for {}", self.loader.model_id());
        while let Some(request) = requests.recv().await {
            debug!("Request {} with {} item(s)", request.id, request.items.len());
            let message = match self.handle_request(&request).await {
                Ok(output) => WorkerMessage::Complete {
                    request_id: request.id,
                    output,
                },
                Err(e) => {
                    error!("Request {} failed: {}", request.id, e);
                    WorkerMessage::Error {
                        request_id: request.id,
                        reason: e.to_string(),
                    }
                }
            };
            if self.tracker.outbound.send(message).is_err() {
                warn!("Orchestrator disconnected, stopping worker session");
                break;
            }
        }
        info!("Worker session stopped");
    }

    /// Classifies every non-empty item of `request`, in order.
    ///
    /// Empty or whitespace-only items are skipped. A request without any
    /// classifiable item is rejected.
    pub async fn handle_request(
        &mut self,
        request: &WorkerRequest,
    ) -> Result<Vec<ClassificationResult>, PipelineError> {
        let items: Vec<(usize, &String)> = request
            .items
            .iter()
            .enumerate()
            .filter(|(index, item)| {
                let keep = !item.trim().is_empty();
                if !keep {
                    let skipped = PipelineError::EmptyItem { index: *index };
                    warn!("Request {}: skipping item, {}", request.id, skipped);
                }
                keep
            })
            .collect();
        if items.is_empty() {
            return Err(PipelineError::Validation("Request contains no text to classify".into()));
        }

        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items {
            let tracker = Arc::clone(&self.tracker);
            let progress: ProgressCallback =
                Arc::new(move |event: LoadEvent| tracker.observe(event));
            let pipeline = self.loader.get_instance(progress).await?;

            let pad_id = match self.pad_id {
                Some(id) => id,
                None => {
                    let id = pipeline.pad_token_id()?;
                    debug!("Using pad token id {}", id);
                    self.pad_id = Some(id);
                    id
                }
            };

            let max_length = self.max_length;
            let text = item.clone();
            let result = tokio::task::spawn_blocking(move || {
                classify_item(pipeline.as_ref(), &text, max_length, pad_id)
            })
            .await
            .map_err(|e| {
                let reason = format!("Classification of item {} panicked: {}", index, e);
                PipelineError::Inference(reason)
            })??;
            debug!("Item {}: {} ({:.4})", index, result.label, result.score);
            results.push(result);
        }
        Ok(results)
    }
}

/// encode -> truncate_and_pad -> decode -> classify
pub fn classify_item<P>(
    pipeline: &P,
    text: &str,
    max_length: usize,
    pad_id: u32,
) -> Result<ClassificationResult, PipelineError>
where
    P: TextClassificationPipeline + ?Sized,
{
    let normalized = pipeline.normalize(text, max_length, pad_id)?;
    pipeline.classify(&normalized)
}
