use std::sync::Arc;
use serde::Serialize;

/// Stage of a single file while the model is being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStage {
    Download,
    Progress,
    Done,
}

/// Per-file loading progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProgress {
    pub file: String,
    pub stage: LoadStage,
    /// Bytes received so far
    pub loaded: u64,
    /// Total size when the server announced one
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn new(file: impl Into<String>, stage: LoadStage, loaded: u64, total: Option<u64>) -> Self {
        Self {
            file: file.into(),
            stage,
            loaded,
            total,
        }
    }

    /// Completion in percent, when the total size is known.
    pub fn percent(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(100.0),
            Some(total) => Some((self.loaded as f32 / total as f32 * 100.0).min(100.0)),
            None => None,
        }
    }
}

/// Events reported while a pipeline is constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Initiate { model: String },
    File(LoadProgress),
    Ready { model: String },
}

pub type ProgressCallback = Arc<dyn Fn(LoadEvent) + Send + Sync>;

/// A callback that drops every event.
pub fn silent() -> ProgressCallback {
    Arc::new(|_| {})
}
