use super::{gitignore_patterns, CrawlConfig, FileFilter};
use crate::contract::{CrawlError, CrawledFile, CrawledFiles, Crawler};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Crawls a directory on the local filesystem.
pub struct LocalCrawler {
    root: PathBuf,
    config: CrawlConfig,
}

impl LocalCrawler {
    pub fn new(root: impl Into<PathBuf>, config: CrawlConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }
}

#[async_trait]
impl Crawler for LocalCrawler {
    async fn crawl(&self) -> Result<CrawledFiles, CrawlError> {
        crawl_dir(&self.root, &self.config)
    }
}

fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

/// Walk `root` and read every accepted file. Shared with the git crawler.
pub(crate) fn crawl_dir(root: &Path, config: &CrawlConfig) -> Result<CrawledFiles, CrawlError> {
    if !root.is_dir() {
        error!(path = %root.display(), "Crawl root is not a directory");
        return Err(CrawlError::NotFound(root.to_path_buf()));
    }
    info!(path = %root.display(), "Crawling local directory");

    let mut filter = FileFilter::new(config)?;
    let gitignore = root.join(".gitignore");
    if gitignore.is_file() {
        let content = std::fs::read_to_string(&gitignore)?;
        let patterns = gitignore_patterns(&content);
        debug!(count = patterns.len(), "Applying .gitignore patterns");
        filter = filter.with_extra_excludes(&patterns)?;
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match relative_path(entry.path(), root) {
                Some(rel) if filter.prunes_dir(&rel) => {
                    debug!(path = %rel, "Skipping directory");
                    false
                }
                _ => true,
            }
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_path(entry.path(), root) else {
            continue;
        };
        if !filter.accepts(&rel) {
            continue;
        }
        let size = entry.metadata()?.len();
        if size > config.max_file_size {
            debug!(path = %rel, size, limit = config.max_file_size, "Skipping file over size limit");
            continue;
        }
        match std::fs::read(entry.path()) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => {
                    debug!(path = %rel, size, "Read file");
                    files.push(CrawledFile { path: rel, content });
                }
                Err(_) => warn!(path = %rel, "Skipping file that is not valid UTF-8"),
            },
            Err(e) => {
                error!(error = ?e, path = %rel, "Failed to read file");
                return Err(CrawlError::Io(e));
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    if files.is_empty() {
        error!(path = %root.display(), "No files matched the crawl patterns");
        return Err(CrawlError::NoFiles);
    }
    info!(count = files.len(), "Completed crawling local directory");
    Ok(CrawledFiles::new(files))
}
