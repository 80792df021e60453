// Integration tests for the local directory crawler: include/exclude globs,
// size limits, .gitignore handling and error cases.

use codebase_tutor_core::contract::{CrawlError, Crawler};
use codebase_tutor_core::crawl::{CrawlConfig, CrawlSource, LocalCrawler, SourceCrawler};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_tree(root: &Path) {
    write(root, "main.py", "print('hi')");
    write(root, "pkg/flow.py", "class Flow: pass");
    write(root, "pkg/big.py", &"x = 1\n".repeat(100));
    write(root, "pkg/tests/test_flow.py", "def test(): pass");
    write(root, "node_modules/lib/index.js", "module.exports = 1");
    write(root, "README.md", "# Demo");
    write(root, "notes.txt", "not included");
    write(root, "generated/out.py", "ignored by gitignore");
    write(root, ".gitignore", "# build output\ngenerated/\n");
}

fn config(include: &[&str], exclude: &[&str], max_file_size: u64) -> CrawlConfig {
    CrawlConfig {
        include: include.iter().map(|s| s.to_string()).collect(),
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        max_file_size,
    }
}

struct TestCase {
    name: &'static str,
    config: CrawlConfig,
    expected: Vec<&'static str>,
}

#[tokio::test]
async fn test_local_crawl_table_driven() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("project");
    sample_tree(&root);

    let test_cases = vec![
        TestCase {
            name: "default patterns",
            config: CrawlConfig::default(),
            expected: vec!["README.md", "main.py", "pkg/big.py", "pkg/flow.py"],
        },
        TestCase {
            name: "python only with size limit",
            config: config(&["*.py"], &["*tests/*"], 100),
            expected: vec!["main.py", "pkg/flow.py"],
        },
        TestCase {
            name: "empty include list takes everything not excluded",
            config: config(&[], &["*node_modules/*", "*.py"], 100_000),
            expected: vec![".gitignore", "README.md", "notes.txt"],
        },
    ];

    for case in test_cases {
        let crawler = LocalCrawler::new(&root, case.config);
        let files = crawler
            .crawl()
            .await
            .unwrap_or_else(|e| panic!("[{}] crawl failed: {e}", case.name));
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, case.expected, "[{}]", case.name);
    }
}

#[tokio::test]
async fn test_file_contents_are_read() {
    let tmp = tempdir().unwrap();
    sample_tree(tmp.path());
    let files = LocalCrawler::new(tmp.path(), config(&["main.py"], &[], 1000))
        .crawl()
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files.get(0).unwrap().content, "print('hi')");
}

#[tokio::test]
async fn test_non_utf8_files_are_skipped() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "ok.rs", "fn main() {}");
    fs::write(tmp.path().join("blob.rs"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
    let files = LocalCrawler::new(tmp.path(), config(&["*.rs"], &[], 1000))
        .crawl()
        .await
        .unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["ok.rs"]);
}

#[tokio::test]
async fn test_missing_directory_is_not_found() {
    let tmp = tempdir().unwrap();
    let crawler = SourceCrawler::for_source(
        CrawlSource::Local(tmp.path().join("does-not-exist")),
        CrawlConfig::default(),
    )
    .unwrap();
    assert!(matches!(crawler.crawl().await, Err(CrawlError::NotFound(_))));
}

#[tokio::test]
async fn test_no_matching_files_is_an_error() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "notes.txt", "nothing to see");
    let result = LocalCrawler::new(tmp.path(), config(&["*.rs"], &[], 1000))
        .crawl()
        .await;
    assert!(matches!(result, Err(CrawlError::NoFiles)));
}
