/// Task every built-in model is exported for.
pub const TASK: &str = "text-classification";

/// The kind of file a model is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Model,
    Tokenizer,
    Config,
}

impl FileKind {
    pub fn file_name(self) -> &'static str {
        match self {
            FileKind::Model => "model.onnx",
            FileKind::Tokenizer => "tokenizer.json",
            FileKind::Config => "config.json",
        }
    }
}

/// One downloadable file of a model.
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub kind: FileKind,
    pub url: String,
    /// Expected SHA-256 digest, hex encoded. Files without one are not verified.
    pub sha256: Option<String>,
}

/// Where to fetch a model from and how to check it.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Local directory name inside the models cache
    pub name: String,
    /// Hugging Face repository id
    pub repo_id: String,
    pub files: Vec<ModelFile>,
}

impl ModelInfo {
    /// Builds the file list for a hub repository exporting an ONNX graph at `onnx_path`.
    pub fn from_hub(name: impl Into<String>, repo_id: impl Into<String>, onnx_path: &str) -> Self {
        let repo_id = repo_id.into();
        let base = format!("https://huggingface.co/{}/resolve/main", repo_id);
        let files = vec![
            ModelFile {
                kind: FileKind::Config,
                url: format!("{}/config.json", base),
                sha256: None,
            },
            ModelFile {
                kind: FileKind::Tokenizer,
                url: format!("{}/tokenizer.json", base),
                sha256: None,
            },
            ModelFile {
                kind: FileKind::Model,
                url: format!("{}/{}", base, onnx_path),
                sha256: None,
            },
        ];
        Self {
            name: name.into(),
            repo_id,
            files,
        }
    }

    pub fn file(&self, kind: FileKind) -> Option<&ModelFile> {
        self.files.iter().find(|file| file.kind == kind)
    }
}

/// Size and shape facts about a model, used for logging and validation.
#[derive(Debug, Clone)]
pub struct ModelCharacteristics {
    pub num_labels: usize,
    pub max_sequence_length: usize,
    pub model_size_mb: usize,
}

/// Models that can be fetched into the cache by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// Six-way emotion classifier fine-tuned from MiniRoBERTa
    EmotionMiniRoberta,
    /// Binary POSITIVE/NEGATIVE sentiment classifier (DistilBERT, SST-2)
    DistilBertSst2,
}

impl BuiltinModel {
    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            BuiltinModel::EmotionMiniRoberta => ModelInfo::from_hub(
                "emotion-miniroberta",
                "dearkarina/my_miniroberta_model",
                "onnx/model_quantized.onnx",
            ),
            BuiltinModel::DistilBertSst2 => ModelInfo::from_hub(
                "distilbert-sst2",
                "Xenova/distilbert-base-uncased-finetuned-sst-2-english",
                "onnx/model_quantized.onnx",
            ),
        }
    }

    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            BuiltinModel::EmotionMiniRoberta => ModelCharacteristics {
                num_labels: 6,
                max_sequence_length: 512,
                model_size_mb: 30,
            },
            BuiltinModel::DistilBertSst2 => ModelCharacteristics {
                num_labels: 2,
                max_sequence_length: 512,
                model_size_mb: 67,
            },
        }
    }

    /// Accepts the cache name or the hub repository id.
    pub fn from_name(name: &str) -> Option<Self> {
        [BuiltinModel::EmotionMiniRoberta, BuiltinModel::DistilBertSst2]
            .into_iter()
            .find(|model| {
                let info = model.get_model_info();
                info.name == name || info.repo_id == name
            })
    }
}

impl Default for BuiltinModel {
    fn default() -> Self {
        BuiltinModel::EmotionMiniRoberta
    }
}
