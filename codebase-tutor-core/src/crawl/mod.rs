//! Collecting the files a tutorial is written about.
//!
//! Three crawlers share one [`CrawlConfig`] and one [`FileFilter`]:
//! - [`LocalCrawler`] walks a directory on disk.
//! - [`GitHubCrawler`] lists and downloads files through the GitHub REST API.
//! - [`GitCrawler`] shallow-clones any other git URL and walks the checkout.
//!
//! [`SourceCrawler`] picks the right one for a [`CrawlSource`].

mod filter;
mod git;
mod github;
mod local;

pub use filter::{gitignore_patterns, FileFilter};
pub use git::GitCrawler;
pub use github::{GitHubCrawler, GitHubLocation};
pub use local::LocalCrawler;

use crate::contract::{CrawlError, CrawledFiles, Crawler};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100_000;

pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &[
    "*.py",
    "*.js",
    "*.jsx",
    "*.ts",
    "*.tsx",
    "*.go",
    "*.java",
    "*.pyi",
    "*.pyx",
    "*.c",
    "*.cc",
    "*.cpp",
    "*.h",
    "*.rs",
    "*.md",
    "*.rst",
    "*Dockerfile",
    "*Makefile",
    "*.yaml",
    "*.yml",
    "*.toml",
];

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "assets/*",
    "data/*",
    "images/*",
    "public/*",
    "static/*",
    "temp/*",
    "*docs/*",
    "*venv/*",
    "*.venv/*",
    "*test*",
    "*tests/*",
    "*examples/*",
    "v1/*",
    "*dist/*",
    "*build/*",
    "*experimental/*",
    "*deprecated/*",
    "*misc/*",
    "*legacy/*",
    ".git/*",
    ".github/*",
    ".next/*",
    ".vscode/*",
    "*obj/*",
    "*bin/*",
    "*node_modules/*",
    "*target/*",
    "*.log",
];

/// Which files to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Where the files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlSource {
    Local(PathBuf),
    Remote {
        url: String,
        /// Personal access token for GitHub; ignored for plain git URLs.
        token: Option<String>,
    },
}

impl CrawlSource {
    pub fn repo_url(&self) -> Option<&str> {
        match self {
            CrawlSource::Local(_) => None,
            CrawlSource::Remote { url, .. } => Some(url),
        }
    }
}

/// Derive a project name: the repository name for URLs, the directory name
/// for local paths.
pub fn project_name_from_source(source: &CrawlSource) -> String {
    match source {
        CrawlSource::Remote { url, .. } => {
            if let Some(location) = GitHubLocation::parse(url) {
                return location.repo;
            }
            url.trim_end_matches('/')
                .rsplit(['/', ':'])
                .next()
                .map(|segment| segment.trim_end_matches(".git").to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "project".to_string())
        }
        CrawlSource::Local(dir) => {
            let resolved = dir.canonicalize().unwrap_or_else(|_| dir.clone());
            resolved
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "project".to_string())
        }
    }
}

/// The crawler matching a [`CrawlSource`].
pub enum SourceCrawler {
    Local(LocalCrawler),
    GitHub(GitHubCrawler),
    Git(GitCrawler),
}

impl SourceCrawler {
    pub fn for_source(source: CrawlSource, config: CrawlConfig) -> Result<Self, CrawlError> {
        match source {
            CrawlSource::Local(root) => {
                info!(root = %root.display(), "Using local directory crawler");
                Ok(SourceCrawler::Local(LocalCrawler::new(root, config)))
            }
            CrawlSource::Remote { url, token } => {
                if let Some(location) = GitHubLocation::parse(&url) {
                    info!(
                        owner = %location.owner,
                        repo = %location.repo,
                        reference = location.reference.as_deref().unwrap_or("default branch"),
                        "Using GitHub API crawler"
                    );
                    Ok(SourceCrawler::GitHub(GitHubCrawler::new(
                        location, token, config,
                    )?))
                } else if url.contains("://") || url.starts_with("git@") {
                    info!(repo_url = %url, "Using git clone crawler");
                    Ok(SourceCrawler::Git(GitCrawler::new(url, config)))
                } else {
                    Err(CrawlError::InvalidUrl(url))
                }
            }
        }
    }
}

#[async_trait]
impl Crawler for SourceCrawler {
    async fn crawl(&self) -> Result<CrawledFiles, CrawlError> {
        match self {
            SourceCrawler::Local(c) => c.crawl().await,
            SourceCrawler::GitHub(c) => c.crawl().await,
            SourceCrawler::Git(c) => c.crawl().await,
        }
    }
}
