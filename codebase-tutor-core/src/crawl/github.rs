use super::{CrawlConfig, FileFilter};
use crate::contract::{CrawlError, CrawledFile, CrawledFiles, Crawler};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// A repository (and optionally a ref and subdirectory) on github.com.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubLocation {
    pub owner: String,
    pub repo: String,
    pub reference: Option<String>,
    /// Subdirectory to crawl, without leading or trailing slashes. Empty for the root.
    pub subdir: String,
}

impl GitHubLocation {
    /// Parse `https://github.com/{owner}/{repo}[.git][/tree/{ref}[/path]]`.
    ///
    /// Returns `None` for anything that is not an http(s) github.com URL.
    /// Refs containing slashes are ambiguous in this form; the first segment
    /// after `tree` is taken as the ref.
    pub fn parse(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?;
        if host != "github.com" && host != "www.github.com" {
            return None;
        }
        let segments: Vec<&str> = parsed
            .path_segments()?
            .filter(|s| !s.is_empty())
            .collect();
        let owner = segments.first()?.to_string();
        let repo = segments.get(1)?.trim_end_matches(".git").to_string();
        if repo.is_empty() {
            return None;
        }
        let (reference, subdir) = match segments.get(2) {
            Some(&"tree") | Some(&"blob") => {
                let reference = segments.get(3).map(|s| s.to_string());
                let subdir = segments.get(4..).map(|s| s.join("/")).unwrap_or_default();
                (reference, subdir)
            }
            _ => (None, String::new()),
        };
        Some(Self {
            owner,
            repo,
            reference,
            subdir,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    Single(ContentEntry),
}

/// Crawls a GitHub repository through the REST contents API.
pub struct GitHubCrawler {
    client: Client,
    api_base: String,
    location: GitHubLocation,
    token: Option<String>,
    config: CrawlConfig,
}

impl GitHubCrawler {
    pub fn new(
        location: GitHubLocation,
        token: Option<String>,
        config: CrawlConfig,
    ) -> Result<Self, CrawlError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("codebase-tutor"));
        let client = Client::builder().default_headers(headers).build()?;
        if token.is_none() {
            warn!("No GitHub token provided; unauthenticated requests are heavily rate limited");
        }
        Ok(Self {
            client,
            api_base: GITHUB_API_URL.to_string(),
            location,
            token,
            config,
        })
    }

    /// Use another API root, e.g. a GitHub Enterprise `https://host/api/v3`.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn get<U: reqwest::IntoUrl>(&self, url: U) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn check(&self, response: reqwest::Response, url: &str) -> Result<reqwest::Response, CrawlError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let rate_limited = status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0");
        let body = response.text().await.unwrap_or_default();
        let message = if rate_limited {
            "rate limit exceeded; provide a GitHub token to raise the limit".to_string()
        } else if status == StatusCode::NOT_FOUND {
            format!("not found: {url} (private repository without a token, or wrong ref/path)")
        } else {
            body
        };
        error!(status = %status, url, message = %message, "GitHub API request failed");
        Err(CrawlError::GitHub {
            status: status.as_u16(),
            message,
        })
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}?ref={reference}`, with
    /// every path segment and the ref percent-encoded.
    fn contents_url(&self, path: &str) -> Result<Url, CrawlError> {
        let invalid = || CrawlError::InvalidUrl(self.api_base.clone());
        let loc = &self.location;
        let mut url = Url::parse(&self.api_base).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["repos", loc.owner.as_str(), loc.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        if let Some(reference) = &loc.reference {
            url.query_pairs_mut().append_pair("ref", reference);
        }
        Ok(url)
    }

    async fn list(&self, path: &str) -> Result<Vec<ContentEntry>, CrawlError> {
        let url = self.contents_url(path)?;
        debug!(url = %url, "Listing GitHub directory");
        let response = self.check(self.get(url.clone()).send().await?, url.as_str()).await?;
        Ok(match response.json::<ContentsResponse>().await? {
            ContentsResponse::Listing(entries) => entries,
            ContentsResponse::Single(entry) => vec![entry],
        })
    }

    fn relative(&self, path: &str) -> String {
        let subdir = &self.location.subdir;
        if subdir.is_empty() {
            return path.to_string();
        }
        let prefix = format!("{subdir}/");
        path.strip_prefix(prefix.as_str()).unwrap_or(path).to_string()
    }
}

#[async_trait]
impl Crawler for GitHubCrawler {
    async fn crawl(&self) -> Result<CrawledFiles, CrawlError> {
        let filter = FileFilter::new(&self.config)?;
        info!(
            owner = %self.location.owner,
            repo = %self.location.repo,
            subdir = %self.location.subdir,
            "Crawling GitHub repository"
        );

        let mut files = Vec::new();
        let mut queue = VecDeque::from([self.location.subdir.clone()]);
        while let Some(dir) = queue.pop_front() {
            for entry in self.list(&dir).await? {
                let rel = self.relative(&entry.path);
                match entry.kind.as_str() {
                    "dir" => {
                        if filter.prunes_dir(&rel) {
                            debug!(path = %rel, "Skipping directory");
                        } else {
                            queue.push_back(entry.path);
                        }
                    }
                    "file" => {
                        if !filter.accepts(&rel) {
                            continue;
                        }
                        if entry.size > self.config.max_file_size {
                            debug!(path = %rel, size = entry.size, "Skipping file over size limit");
                            continue;
                        }
                        let Some(download_url) = entry.download_url else {
                            warn!(path = %rel, "File has no download URL, skipping");
                            continue;
                        };
                        let response = self
                            .check(self.get(&download_url).send().await?, &download_url)
                            .await?;
                        let bytes = response.bytes().await?;
                        match String::from_utf8(bytes.to_vec()) {
                            Ok(content) => {
                                debug!(path = %rel, size = entry.size, "Downloaded file");
                                files.push(CrawledFile { path: rel, content });
                            }
                            Err(_) => warn!(path = %rel, "Skipping file that is not valid UTF-8"),
                        }
                    }
                    other => debug!(path = %rel, kind = other, "Skipping unsupported entry type"),
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        if files.is_empty() {
            error!("No files matched the crawl patterns");
            return Err(CrawlError::NoFiles);
        }
        info!(count = files.len(), "Completed crawling GitHub repository");
        Ok(CrawledFiles::new(files))
    }
}
