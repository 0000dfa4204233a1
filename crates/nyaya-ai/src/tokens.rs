//! Local token estimation, truncation, and chunking.
//!
//! With the `tokenizer` feature and a `tokenizer.json` on disk, counts and
//! cuts use real token ids. Otherwise a fixed four-characters-per-token
//! approximation is used.

use std::path::Path;

use tracing::warn;

/// Characters per token in the approximate fallback.
pub const CHARS_PER_TOKEN: usize = 4;

/// `ceil(chars / 4)`.
pub fn approx_token_count(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Token counter used for budget decisions that must not hit the network.
#[derive(Default)]
pub struct TokenEstimator {
    #[cfg(feature = "tokenizer")]
    tokenizer: Option<tokenizers::Tokenizer>,
}

impl std::fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("exact", &self.is_exact())
            .finish()
    }
}

impl TokenEstimator {
    /// Estimator using the character approximation only.
    pub fn approximate() -> Self {
        Self::default()
    }

    /// Load a `tokenizer.json`.
    #[cfg(feature = "tokenizer")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "tokenizer not found at {path:?}");
        let tokenizer = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tracing::info!(path = %path.display(), "loaded tokenizer");
        Ok(Self {
            tokenizer: Some(tokenizer),
        })
    }

    /// Load from an optional path, falling back to the approximation when the
    /// path is absent, unreadable, or the `tokenizer` feature is off.
    pub fn from_optional_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::approximate();
        };
        #[cfg(feature = "tokenizer")]
        {
            match Self::from_file(path) {
                Ok(estimator) => estimator,
                Err(e) => {
                    warn!(error = %e, "falling back to approximate token counts");
                    Self::approximate()
                }
            }
        }
        #[cfg(not(feature = "tokenizer"))]
        {
            warn!(
                path = %path.display(),
                "tokenizer support not compiled in, using approximate token counts"
            );
            Self::approximate()
        }
    }

    /// Whether counts come from a real tokenizer.
    pub fn is_exact(&self) -> bool {
        #[cfg(feature = "tokenizer")]
        {
            self.tokenizer.is_some()
        }
        #[cfg(not(feature = "tokenizer"))]
        {
            false
        }
    }

    pub fn count(&self, text: &str) -> usize {
        #[cfg(feature = "tokenizer")]
        if let Some(ids) = self.encode(text) {
            return ids.len();
        }
        approx_token_count(text)
    }

    /// Cut `text` to at most `max_tokens` tokens.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> String {
        #[cfg(feature = "tokenizer")]
        if let Some(ids) = self.encode(text) {
            if ids.len() <= max_tokens {
                return text.to_string();
            }
            if let Some(decoded) = self.decode(&ids[..max_tokens]) {
                return decoded;
            }
        }
        truncate_chars(text, max_tokens * CHARS_PER_TOKEN)
    }

    /// Split `text` into consecutive pieces of at most `max_tokens` tokens.
    pub fn chunk(&self, text: &str, max_tokens: usize) -> Vec<String> {
        let max_tokens = max_tokens.max(1);
        #[cfg(feature = "tokenizer")]
        if let Some(ids) = self.encode(text) {
            let decoded: Option<Vec<String>> =
                ids.chunks(max_tokens).map(|c| self.decode(c)).collect();
            if let Some(chunks) = decoded {
                return chunks;
            }
        }
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(max_tokens * CHARS_PER_TOKEN)
            .map(|c| c.iter().collect())
            .collect()
    }

    #[cfg(feature = "tokenizer")]
    fn encode(&self, text: &str) -> Option<Vec<u32>> {
        let tokenizer = self.tokenizer.as_ref()?;
        match tokenizer.encode(text, false) {
            Ok(encoding) => Some(encoding.get_ids().to_vec()),
            Err(e) => {
                warn!(error = %e, "tokenize failed");
                None
            }
        }
    }

    #[cfg(feature = "tokenizer")]
    fn decode(&self, ids: &[u32]) -> Option<String> {
        let tokenizer = self.tokenizer.as_ref()?;
        tokenizer.decode(ids, true).ok()
    }
}
