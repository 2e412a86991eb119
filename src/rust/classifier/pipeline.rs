use super::error::PipelineError;
use super::model::OnnxClassifier;
use super::tokenizer::{truncate_and_pad, TokenizerAdapter};
use super::ClassificationResult;

/// The bound combination of a tokenizer and a classification model.
///
/// The worker only talks to the model through this trait, which keeps the
/// ONNX runtime out of its state machine and lets tests script results.
pub trait TextClassificationPipeline: Send + Sync {
    /// Identifier of the underlying model (a hub repository id or a local path).
    fn model_id(&self) -> &str;

    fn encode(&self, text: &str) -> Result<Vec<u32>, PipelineError>;

    fn decode(&self, ids: &[u32]) -> Result<String, PipelineError>;

    fn pad_token_id(&self) -> Result<u32, PipelineError>;

    /// Encodes `text`, forces the ids to `max_length` and decodes them back.
    fn normalize(
        &self,
        text: &str,
        max_length: usize,
        pad_id: u32,
    ) -> Result<String, PipelineError> {
        let ids = self.encode(text)?;
        self.decode(&truncate_and_pad(&ids, max_length, pad_id))
    }

    /// Top-1 classification of already normalized text.
    fn classify(&self, text: &str) -> Result<ClassificationResult, PipelineError>;
}

/// ONNX-backed pipeline: tokenizer adapter plus [`OnnxClassifier`].
#[derive(Debug)]
pub struct OnnxPipeline {
    model_id: String,
    tokenizer: TokenizerAdapter,
    classifier: OnnxClassifier,
}

impl OnnxPipeline {
    pub fn new(
        model_id: impl Into<String>,
        tokenizer: TokenizerAdapter,
        classifier: OnnxClassifier,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            tokenizer,
            classifier,
        }
    }

    pub fn classifier(&self) -> &OnnxClassifier {
        &self.classifier
    }
}

impl TextClassificationPipeline for OnnxPipeline {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, PipelineError> {
        self.tokenizer.encode(text)
    }

    fn decode(&self, ids: &[u32]) -> Result<String, PipelineError> {
        self.tokenizer.decode(ids)
    }

    fn pad_token_id(&self) -> Result<u32, PipelineError> {
        self.tokenizer.pad_token_id()
    }

    fn normalize(
        &self,
        text: &str,
        max_length: usize,
        pad_id: u32,
    ) -> Result<String, PipelineError> {
        self.tokenizer.normalize(text, max_length, pad_id)
    }

    fn classify(&self, text: &str) -> Result<ClassificationResult, PipelineError> {
        self.classifier.classify(text)
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxPipeline>();
    }
};
