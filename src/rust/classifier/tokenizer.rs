use std::path::Path;
use tokenizers::Tokenizer;
use log::debug;

use super::error::PipelineError;

/// Pad tokens probed, in order, when the tokenizer carries no padding configuration.
const PAD_TOKEN_CANDIDATES: [&str; 3] = ["<pad>", "[PAD]", "<|pad|>"];

/// Normalizes a token sequence to exactly `max_length` ids.
///
/// Longer sequences keep their first `max_length` ids; there is no special
/// handling of a trailing end-of-sequence token. Shorter sequences are
/// right-padded with `pad_id`.
pub fn truncate_and_pad(ids: &[u32], max_length: usize, pad_id: u32) -> Vec<u32> {
    if ids.len() > max_length {
        return ids[..max_length].to_vec();
    }
    let mut padded = Vec::with_capacity(max_length);
    padded.extend_from_slice(ids);
    padded.resize(max_length, pad_id);
    padded
}

/// Thin wrapper over a `tokenizers::Tokenizer` exposing the encode/decode
/// contract the worker relies on.
#[derive(Debug, Clone)]
pub struct TokenizerAdapter {
    tokenizer: Tokenizer,
    add_special_tokens: bool,
    skip_special_tokens: bool,
}

impl TokenizerAdapter {
    /// Wraps an already constructed tokenizer. Special tokens are added on
    /// encode and kept on decode.
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            add_special_tokens: true,
            skip_special_tokens: false,
        }
    }

    /// Loads a `tokenizer.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| {
                PipelineError::Load(format!("Failed to load tokenizer from {:?}: {}", path, e))
            })?;
        Ok(Self::new(tokenizer))
    }

    pub fn with_special_tokens(mut self, add_on_encode: bool, skip_on_decode: bool) -> Self {
        self.add_special_tokens = add_on_encode;
        self.skip_special_tokens = skip_on_decode;
        self
    }

    pub fn inner(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u32>, PipelineError> {
        self.tokenizer
            .encode(text, self.add_special_tokens)
            .map(|encoding| encoding.get_ids().to_vec())
            .map_err(|e| PipelineError::Tokenization(e.to_string()))
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String, PipelineError> {
        self.tokenizer
            .decode(ids, self.skip_special_tokens)
            .map_err(|e| PipelineError::Tokenization(e.to_string()))
    }

    /// Returns the id used to pad sequences.
    ///
    /// The tokenizer's own padding parameters win; otherwise the first known
    /// pad token present in the vocabulary is used.
    pub fn pad_token_id(&self) -> Result<u32, PipelineError> {
        if let Some(padding) = self.tokenizer.get_padding() {
            return Ok(padding.pad_id);
        }
        PAD_TOKEN_CANDIDATES
            .iter()
            .find_map(|token| self.tokenizer.token_to_id(token))
            .ok_or_else(|| PipelineError::Tokenization("Tokenizer defines no pad token".into()))
    }

    /// Encodes `text`, forces the ids to `max_length` and decodes them back.
    pub fn normalize(
        &self,
        text: &str,
        max_length: usize,
        pad_id: u32,
    ) -> Result<String, PipelineError> {
        let ids = self.encode(text)?;
        let fixed = truncate_and_pad(&ids, max_length, pad_id);
        debug!("Normalized {} tokens to {}", ids.len(), fixed.len());
        self.decode(&fixed)
    }
}
