use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::sync::OnceLock;
use log::info;

use crate::classifier::PipelineError;

static ENVIRONMENT: OnceLock<Result<(), String>> = OnceLock::new();

/// ONNX Runtime session settings.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

// GraphOptimizationLevel is neither Clone nor Copy.
fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

/// Parses the level names accepted on the command line.
pub fn parse_optimization_level(name: &str) -> Result<GraphOptimizationLevel, PipelineError> {
    match name.to_ascii_lowercase().as_str() {
        "disable" | "none" | "0" => Ok(GraphOptimizationLevel::Disable),
        "level1" | "basic" | "1" => Ok(GraphOptimizationLevel::Level1),
        "level2" | "extended" | "2" => Ok(GraphOptimizationLevel::Level2),
        "level3" | "all" | "3" => Ok(GraphOptimizationLevel::Level3),
        other => Err(PipelineError::Validation(format!("Unknown optimization level '{}'", other))),
    }
}

/// Commits the process-wide ONNX Runtime environment on first use.
pub fn ensure_initialized() -> Result<(), PipelineError> {
    ENVIRONMENT
        .get_or_init(|| {
            info!("Initializing ONNX Runtime environment");
            ort::init()
                .with_name("moodring")
                .commit()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(PipelineError::Load)
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, PipelineError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}
