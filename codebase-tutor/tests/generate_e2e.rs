// End-to-end run of the binary against a local directory and a mocked
// OpenAI-compatible server.

use assert_cmd::prelude::*;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

async fn mount(server: &MockServer, needle: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(needle))
        .respond_with(chat_reply(content))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_writes_tutorial_from_local_directory() {
    let server = MockServer::start().await;
    mount(
        &server,
        "Identify the top",
        "```yaml\n- name: Greeter\n  description: Says hello.\n  file_indices:\n    - 0 # greet.py\n- name: Runner\n  description: Calls the greeter.\n  file_indices: [1]\n```",
    )
    .await;
    mount(
        &server,
        "Based on the following abstractions",
        "```yaml\nsummary: A tiny greeting app.\nrelationships:\n  - from_abstraction: 1 # Runner\n    to_abstraction: 0 # Greeter\n    label: Calls\n```",
    )
    .await;
    mount(&server, "best order to explain", "```yaml\n- 1\n- 0\n```").await;
    mount(&server, "This is Chapter 1.", "Runner starts everything.").await;
    mount(&server, "This is Chapter 2.", "# Chapter 2: Greeter\n\nGreeter greets.").await;

    let work = tempdir().unwrap();
    let project = work.path().join("hello_app");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("greet.py"), "def greet():\n    return 'hi'\n").unwrap();
    fs::write(project.join("run.py"), "from greet import greet\nprint(greet())\n").unwrap();
    let config = work.path().join("tutor.yaml");
    fs::write(
        &config,
        format!(
            "llm:\n  provider: openai\n  model: test-model\n  base_url: {}/v1\n  api_key_env: TUTOR_E2E_KEY\nretry:\n  max_attempts: 1\n  wait_secs: 0\ncache_file: cache/llm.json\n",
            server.uri()
        ),
    )
    .unwrap();

    let work_dir = work.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("codebase-tutor")
            .expect("Binary exists")
            .current_dir(&work_dir)
            .env_remove("LLM_PROVIDER")
            .env_remove("LLM_MODEL")
            .env("TUTOR_E2E_KEY", "test-key")
            .args(["generate", "--dir", "hello_app", "--output", "out"])
            .arg("--config")
            .arg(work_dir.join("tutor.yaml"))
            .output()
            .expect("binary runs")
    })
    .await
    .unwrap();
    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Tutorial with 2 chapters generated in"));

    let out = work.path().join("out").join("hello_app");
    let index = fs::read_to_string(out.join("index.md")).unwrap();
    assert!(index.contains("# Tutorial: hello_app"));
    assert!(index.contains("A tiny greeting app."));
    assert!(index.contains("1. [Runner](01_runner.md)\n2. [Greeter](02_greeter.md)"));
    assert!(!index.contains("Source Repository"));

    let runner = fs::read_to_string(out.join("01_runner.md")).unwrap();
    assert!(runner.starts_with("# Chapter 1: Runner\n\nRunner starts everything."));
    let greeter = fs::read_to_string(out.join("02_greeter.md")).unwrap();
    assert!(greeter.starts_with("# Chapter 2: Greeter"));

    let cache = fs::read_to_string(work.path().join("cache").join("llm.json")).unwrap();
    let cache: serde_json::Value = serde_json::from_str(&cache).unwrap();
    assert_eq!(cache.as_object().unwrap().len(), 5);
}
