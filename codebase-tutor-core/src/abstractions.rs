//! Stage 1: ask the LLM for the core abstractions of the codebase.

use crate::config::StageSettings;
use crate::contract::{CrawledFiles, LlmClient};
use crate::prompts;
use crate::reply::{parse_index, parse_yaml_reply, required_str, ReplyError, StageError};
use crate::retry::run_with_retries;
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info, warn};

/// A core concept of the codebase and the files that implement it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Abstraction {
    pub name: String,
    pub description: String,
    /// Indices into the crawled files; sorted and unique.
    pub files: Vec<usize>,
}

/// Render the given files as `--- File Index {i}: {path} ---` sections.
pub(crate) fn file_context<I>(files: &CrawledFiles, indices: I) -> String
where
    I: IntoIterator<Item = usize>,
{
    let mut context = String::new();
    for index in indices {
        if let Some(file) = files.get(index) {
            context.push_str(&format!(
                "--- File Index {index}: {} ---\n{}\n\n",
                file.path, file.content
            ));
        }
    }
    context
}

fn file_listing(files: &CrawledFiles) -> String {
    files
        .iter()
        .enumerate()
        .map(|(i, f)| format!("- {i} # {}", f.path))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn identify_abstractions<L>(
    llm: &L,
    files: &CrawledFiles,
    settings: &StageSettings,
) -> Result<Vec<Abstraction>, StageError>
where
    L: LlmClient + ?Sized,
{
    let context = file_context(files, 0..files.len());
    let prompt = prompts::identify_abstractions(settings, &context, &file_listing(files));
    info!(
        files = files.len(),
        context_bytes = context.len(),
        "Identifying abstractions"
    );

    let prompt = prompt.as_str();
    let mut abstractions = run_with_retries(&settings.retry, "identify_abstractions", |attempt| async move {
        let reply = llm.complete(prompt, settings.use_cache && attempt == 0).await?;
        debug!(reply_len = reply.len(), "Received abstractions reply");
        Ok::<_, StageError>(parse_abstractions(&reply, files.len())?)
    })
    .await?;

    if abstractions.len() > settings.max_abstractions {
        warn!(
            returned = abstractions.len(),
            max = settings.max_abstractions,
            "LLM returned too many abstractions, keeping the first ones"
        );
        abstractions.truncate(settings.max_abstractions);
    }
    info!(count = abstractions.len(), "Identified abstractions");
    Ok(abstractions)
}

/// Validate an abstractions reply against `file_count` crawled files.
pub fn parse_abstractions(reply: &str, file_count: usize) -> Result<Vec<Abstraction>, ReplyError> {
    let value = parse_yaml_reply(reply)?;
    let items = value
        .as_sequence()
        .ok_or_else(|| ReplyError::Shape("expected a YAML list of abstractions".into()))?;
    if items.is_empty() {
        return Err(ReplyError::Shape("no abstractions returned".into()));
    }

    let mut abstractions = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_mapping() {
            return Err(ReplyError::Shape(format!("abstraction is not a map: {item:?}")));
        }
        let name = required_str(item, "name")?;
        let description = required_str(item, "description")?;
        let indices = item
            .get("file_indices")
            .and_then(Value::as_sequence)
            .ok_or_else(|| {
                ReplyError::Shape(format!("`file_indices` of {name:?} must be a list"))
            })?;
        let mut files = indices
            .iter()
            .map(|v| parse_index(v, file_count))
            .collect::<Result<Vec<_>, _>>()?;
        files.sort_unstable();
        files.dedup();
        abstractions.push(Abstraction {
            name,
            description,
            files,
        });
    }
    Ok(abstractions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TutorialConfig;
    use crate::contract::{CrawledFile, MockLlmClient};
    use crate::retry::RetryPolicy;

    fn files() -> CrawledFiles {
        CrawledFiles::new(vec![
            CrawledFile {
                path: "src/node.py".into(),
                content: "class Node: pass".into(),
            },
            CrawledFile {
                path: "src/flow.py".into(),
                content: "class Flow(Node): pass".into(),
            },
        ])
    }

    const GOOD_REPLY: &str = "```yaml
- name: |
    Flow
  description: |
    Chains nodes together.
  file_indices:
    - 1 # src/flow.py
    - \"0 # src/node.py\"
    - 1
- name: Node
  description: A single step.
  file_indices: [0]
```";

    #[test]
    fn parses_and_normalises_indices() {
        let parsed = parse_abstractions(GOOD_REPLY, 2).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Flow");
        assert_eq!(parsed[0].description, "Chains nodes together.");
        assert_eq!(parsed[0].files, vec![0, 1]);
        assert_eq!(parsed[1].files, vec![0]);
    }

    #[test]
    fn rejects_out_of_range_file_index() {
        let reply = "```yaml\n- name: A\n  description: d\n  file_indices: [5]\n```";
        assert!(matches!(
            parse_abstractions(reply, 2),
            Err(ReplyError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn rejects_missing_fields_and_wrong_shapes() {
        let no_desc = "```yaml\n- name: A\n  file_indices: [0]\n```";
        assert!(matches!(parse_abstractions(no_desc, 2), Err(ReplyError::Shape(_))));
        let not_list = "```yaml\nname: A\n```";
        assert!(matches!(parse_abstractions(not_list, 2), Err(ReplyError::Shape(_))));
    }

    #[tokio::test]
    async fn retries_invalid_reply_without_cache() {
        let mut llm = MockLlmClient::new();
        let mut seq = mockall::Sequence::new();
        llm.expect_complete()
            .withf(|_, use_cache| *use_cache)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("no yaml here".into()));
        llm.expect_complete()
            .withf(|_, use_cache| !*use_cache)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(GOOD_REPLY.into()));

        let mut config = TutorialConfig::new("demo");
        config.retry = RetryPolicy {
            max_attempts: 2,
            wait_secs: 0,
        };
        let found = identify_abstractions(&llm, &files(), &config.stage_settings())
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn prompt_lists_every_file_with_its_index() {
        let mut llm = MockLlmClient::new();
        llm.expect_complete()
            .withf(|prompt, _| {
                prompt.contains("--- File Index 1: src/flow.py ---")
                    && prompt.contains("- 0 # src/node.py")
            })
            .times(1)
            .returning(|_, _| Ok(GOOD_REPLY.into()));
        let mut config = TutorialConfig::new("demo");
        config.max_abstractions = 1;
        let found = identify_abstractions(&llm, &files(), &config.stage_settings())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
