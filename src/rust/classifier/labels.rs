use std::collections::HashMap;
use std::fs;
use std::path::Path;
use lazy_static::lazy_static;
use serde::Deserialize;

use super::error::PipelineError;

lazy_static! {
    /// Human-readable names for the labels emitted by the built-in emotion model.
    static ref EMOTION_NAMES: HashMap<&'static str, &'static str> = {
        let mut names = HashMap::new();
        names.insert("LABEL_0", "sadness");
        names.insert("LABEL_1", "joy");
        names.insert("LABEL_2", "love");
        names.insert("LABEL_3", "anger");
        names.insert("LABEL_4", "fear");
        names.insert("LABEL_5", "surprise");
        names
    };
}

/// Returns the emotion name for a raw model label, if the label is known.
pub fn emotion_name(label: &str) -> Option<&'static str> {
    EMOTION_NAMES.get(label).copied()
}

/// Coarse sentiment bucket used to name the complementary aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    /// Only the literal `POSITIVE` and `NEGATIVE` labels carry a polarity;
    /// every other label (including the emotion model's `LABEL_n`) is neutral.
    pub fn of(label: &str) -> Self {
        match label {
            "POSITIVE" => Polarity::Positive,
            "NEGATIVE" => Polarity::Negative,
            _ => Polarity::Neutral,
        }
    }

    pub fn complement_label(self) -> &'static str {
        match self {
            Polarity::Positive => "NON-POSITIVE",
            Polarity::Negative => "NON-NEGATIVE",
            Polarity::Neutral => "NON-NEUTRAL",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Maps output indices of the classification head to label strings.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: HashMap<usize, String>,
}

impl LabelMap {
    /// Reads `id2label` from a Hugging Face `config.json`.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| {
                PipelineError::Load(format!("Failed to read model config {:?}: {}", path, e))
            })?;
        Self::from_config_str(&raw)
    }

    pub fn from_config_str(raw: &str) -> Result<Self, PipelineError> {
        let config: ModelConfig = serde_json::from_str(raw)
            .map_err(|e| PipelineError::Load(format!("Invalid model config: {}", e)))?;
        let mut labels = HashMap::with_capacity(config.id2label.len());
        for (id, label) in config.id2label {
            let index = id.parse::<usize>().map_err(|_| {
                PipelineError::Load(format!("Invalid label id '{}' in model config", id))
            })?;
            labels.insert(index, label);
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for output index `index`, falling back to `LABEL_{index}`.
    pub fn label(&self, index: usize) -> String {
        self.labels
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{}", index))
    }
}
