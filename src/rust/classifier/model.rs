use std::collections::HashMap;
use std::path::Path;
use ndarray::{Array1, Array2, ArrayView1};
use ort::session::Session;
use ort::value::Tensor;
use log::{debug, info};

use super::error::PipelineError;
use super::labels::LabelMap;
use super::tokenizer::TokenizerAdapter;
use super::utils::{softmax, top_k_indices};
use super::ClassificationResult;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A sequence-classification model running on ONNX Runtime.
///
/// The graph is expected to:
/// - accept `input_ids` and `attention_mask` (and optionally `token_type_ids`),
///   all shaped `[batch_size=1, sequence_length]`
/// - produce logits shaped `[batch_size=1, num_labels]` as its first output
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    tokenizer: TokenizerAdapter,
    labels: LabelMap,
    uses_token_type_ids: bool,
}

impl OnnxClassifier {
    pub fn from_file<P: AsRef<Path>>(
        model_path: P,
        tokenizer: TokenizerAdapter,
        labels: LabelMap,
        runtime: &RuntimeConfig,
    ) -> Result<Self, PipelineError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(PipelineError::Load(format!("Model file not found: {:?}", model_path)));
        }

        let session = create_session_builder(runtime)?.commit_from_file(model_path)?;
        let uses_token_type_ids = Self::validate_model(&session)?;
        info!(
            "Loaded classification model {:?} ({} labels configured)",
            model_path,
            labels.len()
        );

        Ok(Self {
            session,
            tokenizer,
            labels,
            uses_token_type_ids,
        })
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Runs one forward pass and returns the single best label.
    pub fn classify(&self, text: &str) -> Result<ClassificationResult, PipelineError> {
        self.classify_top_k(text, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Inference("Model produced no labels".into()))
    }

    /// Runs one forward pass and returns the `k` best labels, best first.
    pub fn classify_top_k(
        &self,
        text: &str,
        k: usize,
    ) -> Result<Vec<ClassificationResult>, PipelineError> {
        let logits = self.logits(text)?;
        Ok(rank_labels(logits.view(), &self.labels, k))
    }

    fn logits(&self, text: &str) -> Result<Array1<f32>, PipelineError> {
        let encoding = self
            .tokenizer
            .inner()
            .encode(text, true)
            .map_err(|e| PipelineError::Tokenization(e.to_string()))?;
        let ids = encoding.get_ids();
        let len = ids.len();
        debug!("Classifying sequence of {} tokens", len);

        let input_array = Array2::from_shape_vec((1, len), ids.iter().map(|&x| x as i64).collect())
            .map_err(inference_error("Failed to create input array"))?;
        let input_dyn = input_array.into_dyn();
        let input_ids = input_dyn.as_standard_layout();

        let mask_array = Array2::from_shape_vec(
            (1, len),
            encoding.get_attention_mask().iter().map(|&x| x as i64).collect(),
        )
        .map_err(inference_error("Failed to create mask array"))?;
        let mask_dyn = mask_array.into_dyn();
        let attention_mask = mask_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Tensor::from_array(&input_ids)
            .map_err(inference_error("Failed to create input tensor"))?);
        input_tensors.insert("attention_mask", Tensor::from_array(&attention_mask)
            .map_err(inference_error("Failed to create mask tensor"))?);

        let type_dyn = Array2::<i64>::zeros((1, len)).into_dyn();
        let token_type_ids = type_dyn.as_standard_layout();
        if self.uses_token_type_ids {
            input_tensors.insert("token_type_ids", Tensor::from_array(&token_type_ids)
                .map_err(inference_error("Failed to create type tensor"))?);
        }

        let outputs = self.session.run(input_tensors)
            .map_err(inference_error("Failed to run model"))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(inference_error("Failed to extract output tensor"))?;

        let shape = output_tensor.shape();
        if shape.len() != 2 || shape[0] != 1 || shape[1] == 0 {
            return Err(PipelineError::Inference(format!(
                "Expected logits shaped [1, num_labels], got {:?}",
                shape
            )));
        }
        let row = output_tensor.slice(ndarray::s![0, ..]);
        Ok(Array1::from_iter(row.iter().cloned()))
    }

    /// Checks the graph's inputs/outputs and reports whether it takes `token_type_ids`.
    fn validate_model(session: &Session) -> Result<bool, PipelineError> {
        let names: Vec<&str> = session.inputs.iter().map(|input| input.name.as_str()).collect();
        for required in ["input_ids", "attention_mask"] {
            if !names.contains(&required) {
                return Err(PipelineError::Load(format!(
                    "Model is missing the '{}' input (found {:?})",
                    required, names
                )));
            }
        }
        if session.outputs.is_empty() {
            return Err(PipelineError::Load("Model must have at least 1 output for logits".into()));
        }
        Ok(names.contains(&"token_type_ids"))
    }
}

fn inference_error<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> PipelineError {
    move |e| PipelineError::Inference(format!("{}: {}", context, e))
}

/// Turns raw logits into the `k` most probable labelled results.
pub(crate) fn rank_labels(
    logits: ArrayView1<f32>,
    labels: &LabelMap,
    k: usize,
) -> Vec<ClassificationResult> {
    let probs = softmax(logits);
    top_k_indices(probs.view(), k)
        .into_iter()
        .map(|index| ClassificationResult::new(labels.label(index), probs[index]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rank_labels_top_one() {
        let raw = r#"{"id2label": {"0": "sadness", "1": "joy", "2": "love"}}"#;
        let labels = LabelMap::from_config_str(raw).unwrap();
        let ranked = rank_labels(array![0.1f32, 2.5, 0.3].view(), &labels, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label, "joy");
        assert!(ranked[0].score > 0.5 && ranked[0].score <= 1.0);
    }

    #[test]
    fn test_rank_labels_orders_descending() {
        let ranked = rank_labels(array![0.3f32, 0.1, 0.9].view(), &LabelMap::default(), 3);
        let labels: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["LABEL_2", "LABEL_0", "LABEL_1"]);
        let total: f32 = ranked.iter().map(|r| r.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_missing_model_file() {
        let adapter = crate::classifier::tokenizer::tests::test_adapter();
        let result = OnnxClassifier::from_file(
            "/nonexistent/model.onnx",
            adapter,
            LabelMap::default(),
            &RuntimeConfig::default(),
        );
        assert!(matches!(result, Err(PipelineError::Load(_))));
    }
}
