use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use anyhow::{anyhow, Context};
use clap::Parser;
use env_logger::Env;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

use moodring::{
    emotion_name, parse_optimization_level, BuiltinModel, ModelLoader, ModelManager, ModelSource,
    OnnxPipelineFactory, Orchestrator, PipelineConfig, RuntimeConfig, Update, WorkerMessage,
    DEFAULT_MAX_LENGTH,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force a fresh download of the model files
    #[arg(short, long)]
    fresh: bool,

    /// Built-in model, by cache name or hub id
    #[arg(long, default_value = "emotion-miniroberta")]
    model: String,

    /// Use a local ONNX model instead of a built-in one
    #[arg(long, requires = "tokenizer_path")]
    model_path: Option<PathBuf>,

    /// tokenizer.json for --model-path
    #[arg(long, requires = "model_path")]
    tokenizer_path: Option<PathBuf>,

    /// config.json with id2label for --model-path
    #[arg(long, requires = "model_path")]
    config_path: Option<PathBuf>,

    /// Models cache directory
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Token length every input is truncated or padded to
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Drop padding and other special tokens when decoding normalized input
    #[arg(long)]
    skip_special_tokens: bool,

    /// ONNX graph optimization level (disable, basic, extended, all)
    #[arg(long, default_value = "all")]
    optimization: String,

    /// ONNX intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    intra_threads: usize,

    /// Print each answer as a raw worker message instead of the result panel
    #[arg(long)]
    json: bool,

    /// Classify these texts and exit instead of reading stdin
    #[arg(short, long)]
    text: Vec<String>,
}

fn build_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let runtime = RuntimeConfig {
        intra_threads: args.intra_threads,
        optimization_level: parse_optimization_level(&args.optimization)?,
        ..RuntimeConfig::default()
    };

    let mut config = PipelineConfig::new()
        .with_max_length(args.max_length)
        .with_special_tokens(true, args.skip_special_tokens)
        .with_runtime_config(runtime);
    if let Some(dir) = &args.models_dir {
        config = config.with_models_dir(dir);
    }
    config = match (&args.model_path, &args.tokenizer_path) {
        (Some(model_path), Some(tokenizer_path)) => {
            config.with_local_model(model_path, tokenizer_path, args.config_path.clone())
        }
        _ => {
            let model = BuiltinModel::from_name(&args.model)
                .ok_or_else(|| anyhow!("Unknown model '{}'", args.model))?;
            config.with_builtin_model(model)
        }
    };
    config.validate()?;
    Ok(config)
}

fn remove_cached_model(config: &PipelineConfig) -> anyhow::Result<()> {
    if let ModelSource::Builtin(model) = &config.source {
        info!("Fresh download requested - removing any existing model files...");
        let manager = ModelManager::new(&config.models_dir).context("Failed to open models cache")?;
        manager.remove_download(&model.get_model_info())?;
    }
    Ok(())
}

fn render(orchestrator: &Orchestrator, update: &Update, json: bool) {
    match update {
        Update::Result(id) if json => {
            let output = orchestrator.result().map(<[_]>::to_vec).unwrap_or_default();
            println!("{}", WorkerMessage::Complete { request_id: *id, output }.to_json());
        }
        Update::Failed(id) if json => {
            let reason = orchestrator.failure().unwrap_or_default().to_string();
            println!("{}", WorkerMessage::Error { request_id: *id, reason }.to_json());
        }
        Update::Loading => eprintln!("{}", moodring::LOADING_TEXT),
        Update::Progress(progress) => match progress.percent() {
            Some(percent) => eprintln!("  {} {:?} {:.0}%", progress.file, progress.stage, percent),
            None => eprintln!("  {} {:?}", progress.file, progress.stage),
        },
        Update::Ready => eprintln!("Model ready"),
        Update::Stale(id) => info!("Ignored stale response to request {}", id),
        Update::Result(_) | Update::Failed(_) => {
            if let Some(text) = orchestrator.status_text() {
                println!("{}", text);
            }
            if let Some(view) = orchestrator.sentiment() {
                println!("Sentiment:");
                for (entry, share) in view.entries().iter().zip(view.shares()) {
                    let name = emotion_name(&entry.label)
                        .map(|n| format!(" ({})", n))
                        .unwrap_or_default();
                    println!("  {:<14}{} {:.2}%", entry.label, name, share * 100.0);
                }
            }
        }
    }
}

fn answers_latest(orchestrator: &Orchestrator, update: &Update) -> bool {
    match update {
        Update::Result(id) | Update::Failed(id) => orchestrator.last_request() == Some(*id),
        _ => false,
    }
}

/// Classifies each text in turn, waiting for its answer before sending the next.
async fn run_once(
    orchestrator: &mut Orchestrator,
    texts: &[String],
    json: bool,
) -> anyhow::Result<()> {
    for text in texts {
        let started = Instant::now();
        orchestrator.classify(text)?;
        loop {
            let update = orchestrator
                .next_update()
                .await
                .ok_or_else(|| anyhow!("Worker stopped unexpectedly"))?;
            render(orchestrator, &update, json);
            if answers_latest(orchestrator, &update) {
                break;
            }
        }
        info!("Classified in {:.2?}", started.elapsed());
    }
    Ok(())
}

/// Every stdin line is one input event; responses are rendered as they arrive.
async fn run_interactive(orchestrator: &mut Orchestrator, json: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let mut pending = false;

    eprintln!("Enter text to classify (Ctrl-D to quit)");
    while input_open || pending {
        tokio::select! {
            line = lines.next_line(), if input_open => match line? {
                Some(line) => {
                    orchestrator.classify(&line)?;
                    pending = true;
                }
                None => input_open = false,
            },
            update = orchestrator.next_update() => {
                let update = update.ok_or_else(|| anyhow!("Worker stopped unexpectedly"))?;
                render(orchestrator, &update, json);
                if answers_latest(orchestrator, &update) {
                    pending = false;
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = build_config(&args)?;
    if args.fresh {
        remove_cached_model(&config)?;
    }

    info!("=== Starting classifier for {} ===", config.model_id());
    let max_length = config.max_length;
    let loader = Arc::new(ModelLoader::new(OnnxPipelineFactory::new(config)));
    let mut orchestrator = Orchestrator::spawn(Arc::clone(&loader), max_length);

    let outcome = if args.text.is_empty() {
        run_interactive(&mut orchestrator, args.json).await
    } else {
        run_once(&mut orchestrator, &args.text, args.json).await
    };

    orchestrator.shutdown().await;
    info!("Pipeline constructed {} time(s)", loader.construction_count());
    outcome
}
