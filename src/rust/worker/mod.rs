//! The background classification worker and its message protocol.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use log::warn;

mod protocol;
mod session;

pub use protocol::{split_legacy_text, RequestId, WorkerMessage, WorkerRequest};
pub use session::{classify_item, WorkerLoadState, WorkerSession};

use crate::classifier::PipelineError;
use crate::loader::{ModelLoader, PipelineFactory};

/// The orchestrator's end of a running worker session.
pub struct WorkerHandle {
    requests: UnboundedSender<WorkerRequest>,
    messages: UnboundedReceiver<WorkerMessage>,
    task: JoinHandle<()>,
}

/// Starts a worker session on the tokio runtime.
pub fn spawn_worker<F: PipelineFactory>(
    loader: Arc<ModelLoader<F>>,
    max_length: usize,
) -> WorkerHandle {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let session = WorkerSession::new(loader, max_length, message_tx);
    let task = tokio::spawn(session.run(request_rx));
    WorkerHandle {
        requests: request_tx,
        messages: message_rx,
        task,
    }
}

impl WorkerHandle {
    /// Queues a request without waiting for the worker.
    pub fn send(&self, request: WorkerRequest) -> Result<(), PipelineError> {
        self.requests.send(request).map_err(|_| PipelineError::Disconnected)
    }

    /// Next message if one is already queued. `Err(Disconnected)` once the
    /// worker has stopped and every message has been read.
    pub fn try_recv(&mut self) -> Result<Option<WorkerMessage>, PipelineError> {
        match self.messages.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PipelineError::Disconnected),
        }
    }

    /// Waits for the next message; `None` once the worker has stopped.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.messages.recv().await
    }

    /// Closes the request channel and waits for the session to finish its
    /// current request.
    pub async fn shutdown(self) {
        let WorkerHandle { requests, messages, task } = self;
        drop(requests);
        if let Err(e) = task.await {
            warn!("Worker task ended abnormally: {}", e);
        }
        drop(messages);
    }
}
