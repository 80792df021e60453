use codebase_tutor_core::contract::{CrawlError, Crawler};
use codebase_tutor_core::crawl::{CrawlConfig, GitHubCrawler, GitHubLocation};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry(server: &MockServer, path: &str, kind: &str, size: u64) -> serde_json::Value {
    let download_url = (kind == "file").then(|| format!("{}/raw/{path}", server.uri()));
    json!({"path": path, "type": kind, "size": size, "download_url": download_url})
}

async fn serve_json(server: &MockServer, url_path: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn serve_raw(server: &MockServer, file: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(content))
        .mount(server)
        .await;
}

#[tokio::test]
async fn crawls_subdirectory_through_contents_api() {
    let server = MockServer::start().await;
    serve_json(
        &server,
        "/repos/o/r/contents/pkg",
        json!([
            entry(&server, "pkg/flow.py", "file", 20),
            entry(&server, "pkg/huge.py", "file", 10_000),
            entry(&server, "pkg/logo.png", "file", 5),
            entry(&server, "pkg/core", "dir", 0),
            entry(&server, "pkg/tests", "dir", 0),
        ]),
    )
    .await;
    serve_json(
        &server,
        "/repos/o/r/contents/pkg/core",
        json!([entry(&server, "pkg/core/node.py", "file", 12)]),
    )
    .await;
    serve_raw(&server, "pkg/flow.py", "class Flow: pass\n").await;
    serve_raw(&server, "pkg/core/node.py", "class Node: pass\n").await;

    let location = GitHubLocation::parse("https://github.com/o/r/tree/main/pkg").unwrap();
    let config = CrawlConfig {
        max_file_size: 1_000,
        ..CrawlConfig::default()
    };
    let crawler = GitHubCrawler::new(location, None, config)
        .unwrap()
        .with_api_base(server.uri());

    let files = crawler.crawl().await.expect("crawl succeeds");
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["core/node.py", "flow.py"]);
    assert_eq!(files.get(1).unwrap().content, "class Flow: pass\n");
}

#[tokio::test]
async fn directories_with_reserved_characters_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"path": "C#", "type": "dir", "size": 0, "download_url": null},
            {"path": "my utils", "type": "dir", "size": 0, "download_url": null},
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contents/C%23"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"path": "C#/interop.py", "type": "file", "size": 9,
             "download_url": format!("{}/raw/interop.py", server.uri())},
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contents/my%20utils"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"path": "my utils/helpers.py", "type": "file", "size": 9,
             "download_url": format!("{}/raw/helpers.py", server.uri())},
        ])))
        .expect(1)
        .mount(&server)
        .await;
    serve_raw(&server, "interop.py", "import x\n").await;
    serve_raw(&server, "helpers.py", "import y\n").await;

    let location = GitHubLocation::parse("https://github.com/o/r").unwrap();
    let crawler = GitHubCrawler::new(location, None, CrawlConfig::default())
        .unwrap()
        .with_api_base(server.uri());

    let files = crawler.crawl().await.expect("crawl succeeds");
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["C#/interop.py", "my utils/helpers.py"]);
}

#[tokio::test]
async fn token_is_sent_as_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contents"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([entry(&server, "main.rs", "file", 3)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/main.rs"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fn main() {}"))
        .mount(&server)
        .await;

    let location = GitHubLocation::parse("https://github.com/o/r").unwrap();
    let crawler = GitHubCrawler::new(location, Some("ghp_test".into()), CrawlConfig::default())
        .unwrap()
        .with_api_base(format!("{}/", server.uri()));
    let files = crawler.crawl().await.unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn api_failures_become_github_errors() {
    struct TestCase {
        name: &'static str,
        response: ResponseTemplate,
        status: u16,
        message_contains: &'static str,
    }

    let cases = vec![
        TestCase {
            name: "missing repository",
            response: ResponseTemplate::new(404).set_body_string("Not Found"),
            status: 404,
            message_contains: "not found",
        },
        TestCase {
            name: "exhausted rate limit",
            response: ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"),
            status: 403,
            message_contains: "rate limit",
        },
        TestCase {
            name: "other failure",
            response: ResponseTemplate::new(502).set_body_string("bad gateway"),
            status: 502,
            message_contains: "bad gateway",
        },
    ];

    for case in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(case.response)
            .mount(&server)
            .await;
        let location = GitHubLocation::parse("https://github.com/o/r").unwrap();
        let crawler = GitHubCrawler::new(location, None, CrawlConfig::default())
            .unwrap()
            .with_api_base(server.uri());

        match crawler.crawl().await {
            Err(CrawlError::GitHub { status, message }) => {
                assert_eq!(status, case.status, "{}", case.name);
                assert!(
                    message.contains(case.message_contains),
                    "{}: message was {message:?}",
                    case.name
                );
            }
            other => panic!("{}: expected a GitHub error, got {:?}", case.name, other.map(|f| f.len())),
        }
    }
}

#[tokio::test]
async fn nothing_matching_is_no_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contents"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([entry(&server, "logo.png", "file", 3)])),
        )
        .mount(&server)
        .await;
    let location = GitHubLocation::parse("https://github.com/o/r").unwrap();
    let crawler = GitHubCrawler::new(location, None, CrawlConfig::default())
        .unwrap()
        .with_api_base(server.uri());
    assert!(matches!(crawler.crawl().await, Err(CrawlError::NoFiles)));
}
