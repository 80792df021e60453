// Integration test for the git clone crawler against a throwaway local
// repository served over file://. Skipped when no git binary is available.

use codebase_tutor_core::contract::{CrawlError, Crawler};
use codebase_tutor_core::crawl::{project_name_from_source, CrawlConfig, CrawlSource, SourceCrawler};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_git_crawler_clones_and_filters() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let repo = tmp.path().join("widget");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::write(repo.join("src/lib.rs"), "pub fn widget() {}").unwrap();
    fs::write(repo.join("README.md"), "# Widget").unwrap();
    fs::write(repo.join("data.bin"), "binary-ish").unwrap();
    assert!(git(&repo, &["init", "-q"]));
    assert!(git(&repo, &["add", "."]));
    assert!(git(&repo, &["commit", "-q", "-m", "init"]));

    let source = CrawlSource::Remote {
        url: format!("file://{}", repo.display()),
        token: None,
    };
    assert_eq!(project_name_from_source(&source), "widget");

    let crawler = SourceCrawler::for_source(source, CrawlConfig::default()).unwrap();
    assert!(matches!(crawler, SourceCrawler::Git(_)));
    let files = crawler.crawl().await.expect("clone and crawl should succeed");
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "src/lib.rs"]);
}

#[tokio::test]
async fn test_git_crawler_reports_clone_failure() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let tmp = tempdir().unwrap();
    let source = CrawlSource::Remote {
        url: format!("file://{}", tmp.path().join("missing").display()),
        token: None,
    };
    let crawler = SourceCrawler::for_source(source, CrawlConfig::default()).unwrap();
    assert!(matches!(crawler.crawl().await, Err(CrawlError::Git(_))));
}
