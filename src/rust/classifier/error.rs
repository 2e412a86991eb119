use ort::Error as OrtError;

use crate::model_manager::ModelError;

/// Represents the different types of errors that can occur in the classification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Model, tokenizer or label construction failed
    #[error("Load error: {0}")]
    Load(String),
    /// Text could not be encoded or token ids could not be decoded
    #[error("Tokenization error: {0}")]
    Tokenization(String),
    /// The forward pass or its output extraction failed
    #[error("Inference error: {0}")]
    Inference(String),
    /// An item of a request is empty or whitespace-only
    #[error("Item {index} is empty")]
    EmptyItem { index: usize },
    /// Invalid configuration or request parameters
    #[error("Validation error: {0}")]
    Validation(String),
    /// The other end of a worker channel has gone away
    #[error("Worker disconnected")]
    Disconnected,
}

impl From<OrtError> for PipelineError {
    fn from(err: OrtError) -> Self {
        PipelineError::Load(err.to_string())
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::Load(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_becomes_load_error() {
        let err: PipelineError = ModelError::NotDownloaded("emotion-miniroberta".into()).into();
        assert!(matches!(err, PipelineError::Load(_)));
        assert!(err.to_string().contains("emotion-miniroberta"));
    }

    #[test]
    fn test_empty_item_message() {
        let err = PipelineError::EmptyItem { index: 2 };
        assert_eq!(err.to_string(), "Item 2 is empty");
    }
}
