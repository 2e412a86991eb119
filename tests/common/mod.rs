#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use env_logger::{Builder, Env};
use tokenizers::Tokenizer;

use moodring::{
    ClassificationResult, LoadEvent, LoadProgress, LoadStage, PipelineError, PipelineFactory,
    ProgressCallback, TextClassificationPipeline, TokenizerAdapter,
};

pub const MODEL_ID: &str = "test/scripted-emotion";

/// Word that makes the scripted classifier fail.
pub const FAILING_WORD: &str = "boom";

/// Word that makes the scripted classifier panic.
pub const PANIC_WORD: &str = "crash";

const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [
        {
            "id": 0, "content": "<pad>", "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        }
    ],
    "normalizer": {"type": "Lowercase"},
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "<pad>": 0, "[UNK]": 1, "great": 2, "day": 3, "terrible": 4,
            "i": 5, "feel": 6, "okay": 7, "boom": 8, "crash": 9
        },
        "unk_token": "[UNK]"
    }
}"#;

pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

pub fn test_tokenizer() -> TokenizerAdapter {
    let tokenizer = Tokenizer::from_bytes(TOKENIZER_JSON.as_bytes())
        .expect("test tokenizer json should parse");
    TokenizerAdapter::new(tokenizer)
}

/// Labels keyed by the first word of the normalized text.
pub fn default_responses() -> HashMap<String, ClassificationResult> {
    let mut responses = HashMap::new();
    responses.insert("i".to_string(), ClassificationResult::new("LABEL_1", 0.87));
    responses.insert("great".to_string(), ClassificationResult::new("POSITIVE", 0.9));
    responses.insert("terrible".to_string(), ClassificationResult::new("NEGATIVE", 0.8));
    responses
}

/// A pipeline with a real tokenizer and a canned classifier that records its inputs.
pub struct ScriptedPipeline {
    tokenizer: TokenizerAdapter,
    responses: HashMap<String, ClassificationResult>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedPipeline {
    pub fn new(responses: HashMap<String, ClassificationResult>) -> Self {
        Self {
            tokenizer: test_tokenizer(),
            responses,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Texts passed to `classify`, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl TextClassificationPipeline for ScriptedPipeline {
    fn model_id(&self) -> &str {
        MODEL_ID
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

    fn classify(&self, text: &str) -> Result<ClassificationResult, PipelineError> {
        self.seen.lock().unwrap().push(text.to_string());
        let first = text.split_whitespace().next().unwrap_or_default();
        if first == FAILING_WORD {
            return Err(PipelineError::Inference("scripted failure".into()));
        }
        if first == PANIC_WORD {
            panic!("scripted classifier crashed");
        }
        Ok(self
            .responses
            .get(first)
            .cloned()
            .unwrap_or_else(|| ClassificationResult::new("LABEL_0", 0.5)))
    }
}

/// Builds [`ScriptedPipeline`]s, optionally slowly or failing the first few times.
#[derive(Clone)]
pub struct ScriptedFactory {
    pub builds: Arc<AtomicUsize>,
    pub failures_left: Arc<AtomicUsize>,
    pub delay: Duration,
    pub responses: HashMap<String, ClassificationResult>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            builds: Arc::new(AtomicUsize::new(0)),
            failures_left: Arc::new(AtomicUsize::new(0)),
            delay: Duration::from_millis(0),
            responses: default_responses(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

async fn build_scripted(
    factory: ScriptedFactory,
    progress: ProgressCallback,
) -> Result<ScriptedPipeline, PipelineError> {
    factory.builds.fetch_add(1, Ordering::SeqCst);
    progress(LoadEvent::File(LoadProgress::new("model.onnx", LoadStage::Download, 0, Some(100))));
    tokio::time::sleep(factory.delay).await;

    let failing = factory
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return Err(PipelineError::Load("scripted load failure".into()));
    }

    progress(LoadEvent::File(LoadProgress::new("model.onnx", LoadStage::Done, 100, Some(100))));
    Ok(ScriptedPipeline::new(factory.responses))
}

impl PipelineFactory for ScriptedFactory {
    type Pipeline = ScriptedPipeline;

    fn model_id(&self) -> String {
        MODEL_ID.to_string()
    }

    fn build(
        &self,
        progress: ProgressCallback,
    ) -> impl Future<Output = Result<Self::Pipeline, PipelineError>> + Send {
        build_scripted(self.clone(), progress)
    }
}

/// A progress callback that records every event.
pub fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<LoadEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::<LoadEvent>::new()));
    let sink = Arc::clone(&events);
    let callback: ProgressCallback =
        Arc::new(move |event: LoadEvent| sink.lock().unwrap().push(event));
    (callback, events)
}
