use std::path::PathBuf;

use crate::classifier::PipelineError;
use crate::model_manager::ModelManager;
use crate::models::BuiltinModel;
use crate::runtime::RuntimeConfig;

/// Length every token sequence is normalized to before classification.
pub const DEFAULT_MAX_LENGTH: usize = 50;

/// Where the model files come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// A model fetched into the cache on first use
    Builtin(BuiltinModel),
    /// Files already on disk
    Local {
        model_path: PathBuf,
        tokenizer_path: PathBuf,
        /// `config.json` carrying `id2label`; labels fall back to `LABEL_n` without it
        config_path: Option<PathBuf>,
    },
}

/// Settings for constructing and running the classification pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: ModelSource,
    pub max_length: usize,
    pub models_dir: PathBuf,
    /// Add the tokenizer's special tokens when encoding
    pub add_special_tokens: bool,
    /// Drop special tokens (padding included) when decoding the normalized ids
    pub skip_special_tokens: bool,
    pub runtime: RuntimeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::Builtin(BuiltinModel::default()),
            max_length: DEFAULT_MAX_LENGTH,
            models_dir: ModelManager::get_default_models_dir(),
            add_special_tokens: true,
            skip_special_tokens: false,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_model(mut self, model: BuiltinModel) -> Self {
        self.source = ModelSource::Builtin(model);
        self
    }

    pub fn with_local_model(
        mut self,
        model_path: impl Into<PathBuf>,
        tokenizer_path: impl Into<PathBuf>,
        config_path: Option<PathBuf>,
    ) -> Self {
        self.source = ModelSource::Local {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            config_path,
        };
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_models_dir(mut self, models_dir: impl Into<PathBuf>) -> Self {
        self.models_dir = models_dir.into();
        self
    }

    pub fn with_special_tokens(mut self, add_on_encode: bool, skip_on_decode: bool) -> Self {
        self.add_special_tokens = add_on_encode;
        self.skip_special_tokens = skip_on_decode;
        self
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Identifier reported in `initiate`/`ready` events.
    pub fn model_id(&self) -> String {
        match &self.source {
            ModelSource::Builtin(model) => model.get_model_info().repo_id,
            ModelSource::Local { model_path, .. } => model_path.to_string_lossy().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_length == 0 {
            return Err(PipelineError::Validation("max_length must be greater than 0".into()));
        }
        match &self.source {
            ModelSource::Builtin(model) => {
                let limit = model.characteristics().max_sequence_length;
                if self.max_length > limit {
                    return Err(PipelineError::Validation(format!(
                        "max_length {} exceeds the model limit of {} tokens",
                        self.max_length, limit
                    )));
                }
            }
            ModelSource::Local { model_path, tokenizer_path, .. } => {
                if model_path.as_os_str().is_empty() || tokenizer_path.as_os_str().is_empty() {
                    return Err(PipelineError::Validation(
                        "Model and tokenizer paths cannot be empty".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_length, 50);
        assert!(config.add_special_tokens);
        assert!(!config.skip_special_tokens);
        assert_eq!(config.model_id(), "dearkarina/my_miniroberta_model");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_length_is_rejected() {
        let config = PipelineConfig::new().with_max_length(0);
        assert!(matches!(config.validate(), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_max_length_is_bounded_by_builtin_model() {
        let config = PipelineConfig::new().with_max_length(512);
        assert!(config.validate().is_ok());

        let config = PipelineConfig::new().with_max_length(513);
        assert!(matches!(config.validate(), Err(PipelineError::Validation(_))));

        let local = PipelineConfig::new()
            .with_local_model("/models/m.onnx", "/models/tokenizer.json", None)
            .with_max_length(4096);
        assert!(local.validate().is_ok());
    }

    #[test]
    fn test_local_model() {
        let config = PipelineConfig::new().with_local_model(
            "/models/m.onnx",
            "/models/tokenizer.json",
            None,
        );
        assert_eq!(config.model_id(), "/models/m.onnx");
        assert!(config.validate().is_ok());

        let empty = PipelineConfig::new().with_local_model("", "tokenizer.json", None);
        assert!(empty.validate().is_err());
    }
}
