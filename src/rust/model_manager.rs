use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use reqwest;
use sha2::{Sha256, Digest};
use dirs;
use log;

use crate::models::{FileKind, ModelFile, ModelInfo};
use crate::progress::{LoadEvent, LoadProgress, LoadStage, ProgressCallback};

/// Environment variable overriding the cache root.
pub const CACHE_ENV_VAR: &str = "MOODRING_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Keeps model files in a local cache directory, one sub-directory per model.
#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var(CACHE_ENV_VAR) {
            return PathBuf::from(path).join("models");
        }
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("moodring").join("models");
        }
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("moodring").join("models");
        }
        env::temp_dir().join("moodring").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_file_path(&self, model_name: &str, kind: FileKind) -> PathBuf {
        self.models_dir.join(model_name).join(kind.file_name())
    }

    pub fn get_model_path(&self, model_name: &str) -> PathBuf {
        self.get_file_path(model_name, FileKind::Model)
    }

    pub fn get_tokenizer_path(&self, model_name: &str) -> PathBuf {
        self.get_file_path(model_name, FileKind::Tokenizer)
    }

    pub fn get_config_path(&self, model_name: &str) -> PathBuf {
        self.get_file_path(model_name, FileKind::Config)
    }

    pub fn is_model_downloaded(&self, info: &ModelInfo) -> bool {
        info.files.iter().all(|file| {
            let path = self.get_file_path(&info.name, file.kind);
            log::debug!("  {:?} (exists: {})", path, path.exists());
            path.exists()
        })
    }

    /// Downloads every missing or corrupt file of `info`, reporting progress per file.
    pub async fn download_model(
        &self,
        info: &ModelInfo,
        progress: &ProgressCallback,
    ) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(&info.name);
        log::info!("Preparing model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        for file in &info.files {
            let path = self.get_file_path(&info.name, file.kind);
            let result = if path.exists() && self.verify_file(&path, file.sha256.as_deref())? {
                log::info!("Using cached {:?}", path);
                let size = fs::metadata(&path)?.len();
                progress(LoadEvent::File(LoadProgress::new(
                    file.kind.file_name(),
                    LoadStage::Done,
                    size,
                    Some(size),
                )));
                Ok(())
            } else {
                self.download_and_verify_file(file, &path, progress).await
            };

            if let Err(e) = result {
                log::error!("Failed to set up {} file: {}", file.kind.file_name(), e);
                let _ = self.remove_download(info);
                return Err(e);
            }
        }

        log::info!("Model '{}' ready to use", info.repo_id);
        Ok(())
    }

    /// Returns `true` when `path` matches `expected_hash`, or when there is no hash to check.
    fn verify_file(&self, path: &Path, expected_hash: Option<&str>) -> Result<bool, ModelError> {
        let Some(expected_hash) = expected_hash else {
            return Ok(true);
        };
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash == expected_hash)
    }

    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        for file in &info.files {
            let path = self.get_file_path(&info.name, file.kind);
            if !path.exists() {
                log::info!("{:?} does not exist", path);
                return Ok(false);
            }
            if !self.verify_file(&path, file.sha256.as_deref())? {
                log::warn!("{:?} failed verification", path);
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn download_and_verify_file(
        &self,
        file: &ModelFile,
        path: &Path,
        progress: &ProgressCallback,
    ) -> Result<(), ModelError> {
        let file_name = file.kind.file_name();
        log::info!("Downloading {} from {} to {:?}", file_name, file.url, path);
        progress(LoadEvent::File(LoadProgress::new(file_name, LoadStage::Download, 0, None)));

        let mut response = reqwest::get(&file.url).await?.error_for_status()?;
        let total = response.content_length();
        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            progress(LoadEvent::File(LoadProgress::new(
                file_name,
                LoadStage::Progress,
                bytes.len() as u64,
                total,
            )));
        }
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = &file.sha256 {
            let hash = sha256_hex(&bytes);
            if &hash != expected {
                log::error!("{} hash mismatch: expected {}, got {}", file_name, expected, hash);
                return Err(ModelError::HashMismatch {
                    file_type: file_name.to_string(),
                    expected: expected.clone(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = path.with_extension("part");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, path)?;

        if !self.verify_file(path, file.sha256.as_deref())? {
            return Err(ModelError::VerificationFailed);
        }

        progress(LoadEvent::File(LoadProgress::new(
            file_name,
            LoadStage::Done,
            bytes.len() as u64,
            Some(bytes.len() as u64),
        )));
        Ok(())
    }

    pub fn remove_download(&self, info: &ModelInfo) -> Result<(), ModelError> {
        for file in &info.files {
            let path = self.get_file_path(&info.name, file.kind);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(
        &self,
        info: &ModelInfo,
        progress: &ProgressCallback,
    ) -> Result<(), ModelError> {
        if self.is_model_downloaded(info) && !self.verify_model(info)? {
            log::info!("Model verification failed, re-downloading...");
            self.remove_download(info)?;
        }
        self.download_model(info, progress).await
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
