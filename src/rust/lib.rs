//! Off-thread emotion classification with a two-bucket sentiment view.
//!
//! Text goes to a background worker that lazily loads an ONNX
//! text-classification model, normalizes every item to a fixed token length
//! and returns the top label per item. The interactive side reduces those
//! results to a primary/complementary [`SentimentView`].
//!
//! # Basic Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use moodring::{ModelLoader, OnnxPipelineFactory, Orchestrator, PipelineConfig, Update};
//!
//! let config = PipelineConfig::default();
//! let max_length = config.max_length;
//! let loader = Arc::new(ModelLoader::new(OnnxPipelineFactory::new(config)));
//! let mut orchestrator = Orchestrator::spawn(loader, max_length);
//!
//! orchestrator.classify("I feel okay")?;
//! while let Some(update) = orchestrator.next_update().await {
//!     if matches!(update, Update::Result(_) | Update::Failed(_)) {
//!         break;
//!     }
//! }
//! println!("{:?}", orchestrator.sentiment());
//! # Ok(())
//! # }
//! ```
//!
//! # Batches
//!
//! A request carries an ordered list of items, each classified separately:
//!
//! ```no_run
//! # fn run(orchestrator: &mut moodring::Orchestrator) -> Result<(), moodring::PipelineError> {
//! orchestrator.classify_items(vec!["great day".to_string(), "terrible day".to_string()])?;
//! // Raw text written as a quoted list is split the same way.
//! orchestrator.classify("['great day', 'terrible day']")?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod loader;
pub mod model_manager;
pub mod models;
pub mod orchestrator;
pub mod progress;
mod runtime;
pub mod worker;

pub use aggregate::{aggregate, SentimentView};
pub use classifier::{
    emotion_name, truncate_and_pad, ClassificationResult, LabelMap, OnnxClassifier, OnnxPipeline,
    PipelineError, Polarity, TextClassificationPipeline, TokenizerAdapter,
};
pub use config::{ModelSource, PipelineConfig, DEFAULT_MAX_LENGTH};
pub use loader::{ModelLoader, OnnxPipelineFactory, PipelineFactory};
pub use model_manager::{ModelError, ModelManager};
pub use models::{BuiltinModel, FileKind, ModelCharacteristics, ModelFile, ModelInfo};
pub use orchestrator::{Orchestrator, Update, LOADING_TEXT};
pub use progress::{LoadEvent, LoadProgress, LoadStage, ProgressCallback};
pub use runtime::{create_session_builder, parse_optimization_level, RuntimeConfig};
pub use worker::{
    spawn_worker, split_legacy_text, RequestId, WorkerHandle, WorkerLoadState, WorkerMessage,
    WorkerRequest, WorkerSession,
};

pub fn init_logger() {
    env_logger::init();
}
