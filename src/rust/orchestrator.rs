//! Interactive-side owner of the worker.
//!
//! The orchestrator never waits for the worker: requests are queued, and its
//! view of the pipeline (`ready`, `result`, `sentiment`, `failure`) changes only
//! when a worker message is applied.

use std::sync::Arc;
use log::{debug, info, warn};

use crate::aggregate::{aggregate, SentimentView};
use crate::classifier::{ClassificationResult, PipelineError};
use crate::loader::{ModelLoader, PipelineFactory};
use crate::progress::LoadProgress;
use crate::worker::{spawn_worker, RequestId, WorkerHandle, WorkerMessage, WorkerRequest};

/// Text shown while the model loads or a result is pending.
pub const LOADING_TEXT: &str = "Loading...";

/// What applying a worker message changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Loading,
    Progress(LoadProgress),
    Ready,
    Result(RequestId),
    Failed(RequestId),
    /// A completion or error for a request that has since been superseded
    Stale(RequestId),
}

pub struct Orchestrator {
    worker: WorkerHandle,
    last_sent: RequestId,
    ready: Option<bool>,
    result: Option<Vec<ClassificationResult>>,
    sentiment: Option<SentimentView>,
    failure: Option<String>,
    progress: Option<LoadProgress>,
}

impl Orchestrator {
    pub fn new(worker: WorkerHandle) -> Self {
        Self {
            worker,
            last_sent: 0,
            ready: None,
            result: None,
            sentiment: None,
            failure: None,
            progress: None,
        }
    }

    /// Spawns a worker session over `loader` and takes ownership of it.
    pub fn spawn<F: PipelineFactory>(loader: Arc<ModelLoader<F>>, max_length: usize) -> Self {
        Self::new(spawn_worker(loader, max_length))
    }

    /// Sends raw input text, splitting bracketed batches into items.
    pub fn classify(&mut self, text: &str) -> Result<RequestId, PipelineError> {
        let id = self.next_id();
        self.dispatch(WorkerRequest::from_text(id, text))
    }

    /// Sends an explicit list of items.
    pub fn classify_items(&mut self, items: Vec<String>) -> Result<RequestId, PipelineError> {
        let id = self.next_id();
        self.dispatch(WorkerRequest::new(id, items))
    }

    fn next_id(&self) -> RequestId {
        self.last_sent + 1
    }

    fn dispatch(&mut self, request: WorkerRequest) -> Result<RequestId, PipelineError> {
        let id = request.id;
        self.worker.send(request)?;
        self.last_sent = id;
        self.failure = None;
        debug!("Sent request {}", id);
        Ok(id)
    }

    /// Applies every message already queued, without waiting.
    pub fn poll(&mut self) -> Result<Vec<Update>, PipelineError> {
        let mut updates = Vec::new();
        while let Some(message) = self.worker.try_recv()? {
            updates.push(self.apply(message));
        }
        Ok(updates)
    }

    /// Waits for the next message and applies it. `None` once the worker is gone.
    pub async fn next_update(&mut self) -> Option<Update> {
        let message = self.worker.recv().await?;
        Some(self.apply(message))
    }

    pub fn apply(&mut self, message: WorkerMessage) -> Update {
        match message {
            WorkerMessage::Initiate { model } => {
                info!("Loading model {}", model);
                self.ready = Some(false);
                Update::Loading
            }
            WorkerMessage::Progress(progress) => {
                self.progress = Some(progress.clone());
                Update::Progress(progress)
            }
            WorkerMessage::Ready { model } => {
                info!("Model {} ready", model);
                self.ready = Some(true);
                self.progress = None;
                Update::Ready
            }
            WorkerMessage::Complete { request_id, output } => {
                if request_id != self.last_sent {
                    debug!(
                        "Discarding stale completion {} (latest is {})",
                        request_id, self.last_sent
                    );
                    return Update::Stale(request_id);
                }
                self.sentiment = aggregate(&output);
                self.result = Some(output);
                self.failure = None;
                Update::Result(request_id)
            }
            WorkerMessage::Error { request_id, reason } => {
                if request_id != self.last_sent {
                    debug!("Discarding stale error {} (latest is {})", request_id, self.last_sent);
                    return Update::Stale(request_id);
                }
                warn!("Request {} failed: {}", request_id, reason);
                self.failure = Some(reason);
                Update::Failed(request_id)
            }
        }
    }

    /// `None` until the worker has reported its first load status.
    pub fn ready(&self) -> Option<bool> {
        self.ready
    }

    pub fn result(&self) -> Option<&[ClassificationResult]> {
        self.result.as_deref()
    }

    pub fn sentiment(&self) -> Option<&SentimentView> {
        self.sentiment.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn progress(&self) -> Option<&LoadProgress> {
        self.progress.as_ref()
    }

    pub fn last_request(&self) -> Option<RequestId> {
        (self.last_sent > 0).then_some(self.last_sent)
    }

    pub fn is_loading(&self) -> bool {
        self.failure.is_none() && (self.ready != Some(true) || self.result.is_none())
    }

    /// The debug panel: the failure reason, nothing before the first load
    /// status, `Loading...`, or the raw results as pretty JSON.
    pub fn status_text(&self) -> Option<String> {
        if let Some(reason) = &self.failure {
            return Some(format!("Error: {}", reason));
        }
        self.ready?;
        match &self.result {
            Some(result) if self.ready == Some(true) => Some(
                serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("Error: {}", e)),
            ),
            _ => Some(LOADING_TEXT.to_string()),
        }
    }

    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }
}
