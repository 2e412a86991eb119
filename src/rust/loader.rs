//! Lazy, memoized construction of the classification pipeline.
//!
//! [`ModelLoader`] plays the role of the pipeline singleton: the first
//! `get_instance` call builds the pipeline through a [`PipelineFactory`],
//! every later call (including ones racing the first) receives the same handle.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use log::{debug, info, warn};

use crate::classifier::{
    LabelMap, OnnxClassifier, OnnxPipeline, PipelineError, TextClassificationPipeline,
    TokenizerAdapter,
};
use crate::config::{ModelSource, PipelineConfig};
use crate::model_manager::{ModelError, ModelManager};
use crate::models::TASK;
use crate::progress::{LoadEvent, ProgressCallback};

/// Builds pipelines for a [`ModelLoader`].
pub trait PipelineFactory: Send + Sync + 'static {
    type Pipeline: TextClassificationPipeline + 'static;

    /// Identifier of the model this factory builds.
    fn model_id(&self) -> String;

    /// Constructs a pipeline, reporting per-file progress through `progress`.
    fn build(
        &self,
        progress: ProgressCallback,
    ) -> impl Future<Output = Result<Self::Pipeline, PipelineError>> + Send;
}

/// Holds the memoized pipeline handle.
pub struct ModelLoader<F: PipelineFactory> {
    factory: F,
    instance: OnceCell<Arc<F::Pipeline>>,
    constructions: AtomicUsize,
}

impl<F: PipelineFactory> ModelLoader<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            instance: OnceCell::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn model_id(&self) -> String {
        self.factory.model_id()
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.initialized()
    }

    /// Number of times the factory has been asked to build a pipeline.
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// Returns the pipeline, constructing it on first use.
    ///
    /// The constructing call reports `Initiate`, the factory's file events and
    /// `Ready`. Any other call only reports `Ready`. A failed construction
    /// leaves the loader empty so the next call tries again.
    pub async fn get_instance(
        &self,
        progress: ProgressCallback,
    ) -> Result<Arc<F::Pipeline>, PipelineError> {
        let constructed_here = AtomicBool::new(false);
        let flag = &constructed_here;
        let factory = &self.factory;
        let constructions = &self.constructions;
        let callback = &progress;

        let pipeline = self
            .instance
            .get_or_try_init(move || async move {
                flag.store(true, Ordering::SeqCst);
                constructions.fetch_add(1, Ordering::SeqCst);
                let model = factory.model_id();
                info!("Constructing {} pipeline for {}", TASK, model);
                callback(LoadEvent::Initiate { model });
                let pipeline = factory.build(Arc::clone(callback)).await?;
                Ok::<_, PipelineError>(Arc::new(pipeline))
            })
            .await?;

        if !constructed_here.load(Ordering::SeqCst) {
            debug!("Reusing pipeline for {}", pipeline.model_id());
        }
        progress(LoadEvent::Ready {
            model: pipeline.model_id().to_string(),
        });
        Ok(Arc::clone(pipeline))
    }
}

/// Builds [`OnnxPipeline`]s from a [`PipelineConfig`], downloading built-in
/// models into the cache when needed.
#[derive(Debug, Clone)]
pub struct OnnxPipelineFactory {
    config: PipelineConfig,
}

impl OnnxPipelineFactory {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl PipelineFactory for OnnxPipelineFactory {
    type Pipeline = OnnxPipeline;

    fn model_id(&self) -> String {
        self.config.model_id()
    }

    fn build(
        &self,
        progress: ProgressCallback,
    ) -> impl Future<Output = Result<Self::Pipeline, PipelineError>> + Send {
        build_onnx_pipeline(self.config.clone(), progress)
    }
}

async fn build_onnx_pipeline(
    config: PipelineConfig,
    progress: ProgressCallback,
) -> Result<OnnxPipeline, PipelineError> {
    config.validate()?;
    let model_id = config.model_id();

    let (model_path, tokenizer_path, config_path) = match &config.source {
        ModelSource::Builtin(model) => {
            let info = model.get_model_info();
            let manager = ModelManager::new(&config.models_dir).map_err(ModelError::from)?;
            manager.ensure_model_downloaded(&info, &progress).await?;
            (
                manager.get_model_path(&info.name),
                manager.get_tokenizer_path(&info.name),
                Some(manager.get_config_path(&info.name)),
            )
        }
        ModelSource::Local { model_path, tokenizer_path, config_path } => {
            (model_path.clone(), tokenizer_path.clone(), config_path.clone())
        }
    };

    let expected_labels = match &config.source {
        ModelSource::Builtin(model) => {
            let characteristics = model.characteristics();
            info!(
                "Using {} ({} labels, ~{} MB)",
                model_id, characteristics.num_labels, characteristics.model_size_mb
            );
            Some(characteristics.num_labels)
        }
        ModelSource::Local { .. } => None,
    };
    let runtime = config.runtime.clone();
    let (add_special, skip_special) = (config.add_special_tokens, config.skip_special_tokens);
    tokio::task::spawn_blocking(move || -> Result<OnnxPipeline, PipelineError> {
        let tokenizer = TokenizerAdapter::from_file(&tokenizer_path)?
            .with_special_tokens(add_special, skip_special);
        info!("Tokenizer loaded successfully");
        let labels = match config_path {
            Some(path) => LabelMap::from_config_file(path)?,
            None => LabelMap::default(),
        };
        let classifier =
            OnnxClassifier::from_file(&model_path, tokenizer.clone(), labels, &runtime)?;
        if let Some(expected) = expected_labels {
            check_label_count(classifier.labels(), expected);
        }
        Ok(OnnxPipeline::new(model_id, tokenizer, classifier))
    })
    .await
    .map_err(|e| PipelineError::Load(format!("Pipeline construction panicked: {}", e)))?
}

/// Warns when a built-in model's `config.json` disagrees with its known label count.
/// Returns whether the counts match.
fn check_label_count(labels: &LabelMap, expected: usize) -> bool {
    let matches = labels.is_empty() || labels.len() == expected;
    if !matches {
        warn!(
            "config.json defines {} labels but the model is known to have {}",
            labels.len(),
            expected
        );
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::silent;

    #[tokio::test]
    async fn test_missing_local_files_fail_and_can_retry() {
        let config = PipelineConfig::new().with_local_model(
            "/nonexistent/model.onnx",
            "/nonexistent/tokenizer.json",
            None,
        );
        let loader = ModelLoader::new(OnnxPipelineFactory::new(config));

        assert!(matches!(loader.get_instance(silent()).await, Err(PipelineError::Load(_))));
        assert!(!loader.is_loaded());
        assert!(loader.get_instance(silent()).await.is_err());
        assert_eq!(loader.construction_count(), 2);
    }

    #[test]
    fn test_label_count_check() {
        let raw = r#"{"id2label": {"0": "NEGATIVE", "1": "POSITIVE"}}"#;
        let labels = LabelMap::from_config_str(raw).unwrap();
        assert!(check_label_count(&labels, 2));
        assert!(!check_label_count(&labels, 6));
        assert!(check_label_count(&LabelMap::default(), 6));
    }

    #[tokio::test]
    async fn test_invalid_config_is_reported_as_validation_error() {
        let config = PipelineConfig::new().with_max_length(0);
        let loader = ModelLoader::new(OnnxPipelineFactory::new(config));
        assert!(matches!(loader.get_instance(silent()).await, Err(PipelineError::Validation(_))));
    }
}
