//! # contract: the seams of the tutorial pipeline
//!
//! Two traits decouple the pipeline from the outside world:
//! - [`Crawler`] produces the set of source files a tutorial is written about
//!   (local directory, GitHub API, plain `git clone`, or a test mock).
//! - [`LlmClient`] turns one prompt into one completion (a provider API
//!   client, a caching wrapper, or a test mock).
//!
//! Both traits are annotated for `mockall` so integration tests can drive the
//! whole flow deterministically without a network.

use async_trait::async_trait;
use mockall::automock;
use std::path::PathBuf;
use thiserror::Error;

/// A single crawled file. `path` is relative to the crawl root and always uses `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledFile {
    pub path: String,
    pub content: String,
}

/// Ordered set of crawled files. A file's position is its index in prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawledFiles {
    pub files: Vec<CrawledFile>,
}

impl CrawledFiles {
    pub fn new(files: Vec<CrawledFile>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CrawledFile> {
        self.files.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrawledFile> {
        self.files.iter()
    }

    /// Total number of content bytes, used for logging only.
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }
}

/// Errors raised while collecting files.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("directory does not exist: {0}")]
    NotFound(PathBuf),

    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("unsupported repository URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub API error ({status}): {message}")]
    GitHub { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("git failed: {0}")]
    Git(String),

    #[error("no files matched the include/exclude patterns")]
    NoFiles,
}

/// Errors raised by an LLM client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("rate limited by LLM provider")]
    RateLimited,

    #[error("could not parse LLM response: {0}")]
    Parse(String),

    #[error("LLM returned an empty response")]
    Empty,
}

/// Trait for collecting the files a tutorial is written about.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Crawl the configured source and return the matching files, sorted by path.
    async fn crawl(&self) -> Result<CrawledFiles, CrawlError>;
}

/// Trait for a single-shot LLM completion.
///
/// `use_cache` is a hint for caching wrappers: when false, a wrapper must not
/// serve a stored answer and must not store the new one. Transport clients
/// ignore it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, use_cache: bool) -> Result<String, LlmError>;
}
