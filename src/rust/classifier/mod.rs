use serde::{Deserialize, Serialize};

mod error;
mod labels;
mod model;
mod pipeline;
pub(crate) mod tokenizer;
mod utils;

pub use error::PipelineError;
pub use labels::{emotion_name, LabelMap, Polarity};
pub use model::OnnxClassifier;
pub use pipeline::{OnnxPipeline, TextClassificationPipeline};
pub use tokenizer::{truncate_and_pad, TokenizerAdapter};

/// A single label and its probability, one per classified item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub score: f32,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}
