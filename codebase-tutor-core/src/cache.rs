//! On-disk cache of LLM responses, keyed by the SHA-256 of the prompt.
//!
//! Re-running the tool on an unchanged codebase replays every answer from the
//! cache instead of paying for the same completions again. The file is plain
//! JSON (`{"<sha256 hex>": "<response>"}`) and is rewritten after each
//! insert through a temp file in the same directory, so an interrupted run
//! never leaves a truncated cache behind.

use crate::contract::{LlmClient, LlmError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_CACHE_FILE: &str = "llm_cache.json";

pub fn prompt_key(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct ResponseCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl ResponseCache {
    /// Open the cache at `path`. A missing or unreadable file yields an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(map) => {
                    info!(path = %path.display(), entries = map.len(), "Loaded LLM response cache");
                    map
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Cache file is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache file yet");
                HashMap::new()
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read cache file, starting empty");
                HashMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, prompt: &str) -> Option<String> {
        let key = prompt_key(prompt);
        self.entries.lock().ok()?.get(&key).cloned()
    }

    /// Store a response and persist the whole cache.
    pub fn insert(&self, prompt: &str, response: &str) -> std::io::Result<()> {
        let snapshot = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| std::io::Error::other("cache lock poisoned"))?;
            entries.insert(prompt_key(prompt), response.to_string());
            serde_json::to_vec_pretty(&*entries)?
        };
        self.persist(&snapshot)
    }

    fn persist(&self, bytes: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(bytes)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// An [`LlmClient`] that answers from a [`ResponseCache`] when allowed to.
pub struct CachedLlm<C> {
    inner: C,
    cache: ResponseCache,
}

impl<C> CachedLlm<C> {
    pub fn new(inner: C, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for CachedLlm<C> {
    async fn complete(&self, prompt: &str, use_cache: bool) -> Result<String, LlmError> {
        if use_cache {
            if let Some(hit) = self.cache.get(prompt) {
                debug!(prompt_len = prompt.len(), "LLM cache hit");
                return Ok(hit);
            }
        }
        let response = self.inner.complete(prompt, use_cache).await?;
        if use_cache {
            if let Err(e) = self.cache.insert(prompt, &response) {
                warn!(error = %e, path = %self.cache.path().display(), "Failed to persist LLM cache");
            }
        }
        Ok(response)
    }
}
