use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::tempdir;

/// The binary with a clean, network-free environment rooted in `dir`.
fn tutor_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("codebase-tutor").expect("Binary exists");
    cmd.current_dir(dir)
        .env_remove("LLM_PROVIDER")
        .env_remove("LLM_MODEL")
        .env_remove("GITHUB_TOKEN")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn help_lists_generate_subcommand() {
    let tmp = tempdir().unwrap();
    tutor_cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn generate_help_lists_options() {
    let tmp = tempdir().unwrap();
    tutor_cmd(tmp.path())
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--repo")
                .and(predicate::str::contains("--dir"))
                .and(predicate::str::contains("--max-abstractions"))
                .and(predicate::str::contains("--no-cache")),
        );
}

#[test]
fn repo_and_dir_are_mutually_exclusive() {
    let tmp = tempdir().unwrap();
    tutor_cmd(tmp.path())
        .args(["generate", "--repo", "https://github.com/o/r", "--dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn a_source_is_required() {
    let tmp = tempdir().unwrap();
    tutor_cmd(tmp.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn missing_api_key_is_reported() {
    let tmp = tempdir().unwrap();
    tutor_cmd(tmp.path())
        .env("LLM_PROVIDER", "gemini")
        .env_remove("GEMINI_API_KEY")
        .args(["generate", "--dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn missing_directory_fails_before_any_llm_call() {
    let tmp = tempdir().unwrap();
    tutor_cmd(tmp.path())
        .env("LLM_PROVIDER", "anthropic")
        .env("ANTHROPIC_API_KEY", "not-used")
        .args(["generate", "--dir", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("directory does not exist"));
    assert!(!tmp.path().join("output").exists());
}

#[test]
fn invalid_config_file_is_reported() {
    let tmp = tempdir().unwrap();
    let config = tmp.path().join("tutor.yaml");
    write(&config, "llm: [not, a, map]\n").unwrap();
    tutor_cmd(tmp.path())
        .args(["generate", "--dir", "."])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config YAML"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use codebase_tutor::cli::{run, Cli, Commands, GenerateArgs};

    // A config path that does not exist: run fails right after the trace event.
    let cli = Cli {
        command: Commands::Generate(GenerateArgs {
            dir: Some(std::path::PathBuf::from(".")),
            config: Some(std::path::PathBuf::from("dummy.yaml")),
            ..Default::default()
        }),
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
