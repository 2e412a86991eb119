use serde::Serialize;

use crate::classifier::ClassificationResult;
use crate::progress::LoadProgress;

/// Identifies a request; echoed back in its completion or error.
pub type RequestId = u64;

/// A classification request: an ordered list of independent items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerRequest {
    pub id: RequestId,
    pub items: Vec<String>,
}

impl WorkerRequest {
    pub fn new(id: RequestId, items: Vec<String>) -> Self {
        Self { id, items }
    }

    /// Builds a request from raw input text, splitting bracketed batches with
    /// [`split_legacy_text`].
    pub fn from_text(id: RequestId, text: &str) -> Self {
        Self::new(id, split_legacy_text(text))
    }
}

/// Splits raw text written as a quoted list, such as `['great day', 'terrible day']`.
///
/// Text is a batch when it has both brackets and either a quoted-comma
/// delimiter (`', ` or `", `) or a single quoted item (`['great day']`). The
/// first `[` and the first `]` are removed, the whole remaining text is split on
/// the delimiter and each piece loses its surrounding whitespace and quotes.
/// Anything else is a single item, returned unchanged.
pub fn split_legacy_text(text: &str) -> Vec<String> {
    if !is_quoted_list(text) {
        return vec![text.to_string()];
    }

    text.replacen('[', "", 1)
        .replacen(']', "", 1)
        .replace("\", ", "', ")
        .split("', ")
        .map(|piece| {
            piece
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .trim()
                .to_string()
        })
        .collect()
}

fn is_quoted_list(text: &str) -> bool {
    if !text.contains('[') || !text.contains(']') {
        return false;
    }
    if text.contains("', ") || text.contains("\", ") {
        return true;
    }
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim);
    match inner {
        Some(item) if item.len() >= 2 => {
            (item.starts_with('\'') && item.ends_with('\''))
                || (item.starts_with('"') && item.ends_with('"'))
        }
        _ => false,
    }
}

/// Messages sent from the worker to the orchestrator, tagged by `status` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// Model loading started
    Initiate { model: String },
    /// A model file is being fetched
    Progress(LoadProgress),
    /// The pipeline is usable
    Ready { model: String },
    /// One result per non-empty item, in item order
    Complete {
        request_id: RequestId,
        output: Vec<ClassificationResult>,
    },
    /// The request failed; the worker keeps serving
    Error { request_id: RequestId, reason: String },
}

impl WorkerMessage {
    /// Request the message answers, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            WorkerMessage::Complete { request_id, .. } => Some(*request_id),
            WorkerMessage::Error { request_id, .. } => Some(*request_id),
            WorkerMessage::Initiate { .. }
            | WorkerMessage::Progress(_)
            | WorkerMessage::Ready { .. } => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({"status": "error", "reason": e.to_string()}).to_string()
        })
    }
}
