use super::local::crawl_dir;
use super::CrawlConfig;
use crate::contract::{CrawlError, CrawledFiles, Crawler};
use async_trait::async_trait;
use std::process::Command;
use tracing::{error, info};

/// Crawls any git URL (SSH, GitLab, self-hosted) by shallow-cloning it into
/// a temporary directory that is removed once the crawl finishes.
pub struct GitCrawler {
    repo_url: String,
    config: CrawlConfig,
}

impl GitCrawler {
    pub fn new(repo_url: String, config: CrawlConfig) -> Self {
        Self { repo_url, config }
    }
}

#[async_trait]
impl Crawler for GitCrawler {
    async fn crawl(&self) -> Result<CrawledFiles, CrawlError> {
        let checkout = tempfile::tempdir()?;
        let target = checkout.path().join("repo");

        // `git clone --depth 1 <repo_url> <target>`
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(&self.repo_url)
            .arg(&target)
            .output();

        match output {
            Ok(out) if out.status.success() => {
                info!(
                    repo_url = %self.repo_url,
                    path = %target.display(),
                    "Successfully cloned git repository"
                );
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                error!(
                    repo_url = %self.repo_url,
                    status = %out.status,
                    stderr = %stderr,
                    "Git clone exited with non-zero code"
                );
                return Err(CrawlError::Git(format!(
                    "git clone {} exited with {}: {}",
                    self.repo_url, out.status, stderr
                )));
            }
            Err(e) => {
                error!(error = ?e, repo_url = %self.repo_url, "Failed to launch git process");
                return Err(CrawlError::Git(format!("failed to launch git: {e}")));
            }
        }

        crawl_dir(&target, &self.config)
    }
}
