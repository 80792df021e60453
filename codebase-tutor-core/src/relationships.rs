//! Stage 2: a project summary and the interactions between abstractions.

use crate::abstractions::{file_context, Abstraction};
use crate::config::StageSettings;
use crate::contract::{CrawledFiles, LlmClient};
use crate::prompts;
use crate::reply::{parse_index, parse_yaml_reply, required_str, ReplyError, StageError};
use crate::retry::run_with_retries;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A directed interaction `from -> to` between two abstractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipMap {
    /// Markdown summary of the whole project.
    pub summary: String,
    pub details: Vec<Relationship>,
}

/// `- {i} # {name}` lines, one per abstraction.
pub(crate) fn abstraction_listing(abstractions: &[Abstraction]) -> String {
    abstractions
        .iter()
        .enumerate()
        .map(|(i, a)| format!("- {i} # {}", a.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn relationships_context(abstractions: &[Abstraction], files: &CrawledFiles) -> String {
    let mut context = String::from("Identified Abstractions:\n");
    let mut referenced = BTreeSet::new();
    for (i, a) in abstractions.iter().enumerate() {
        let indices = a
            .files
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        context.push_str(&format!(
            "- Index {i}: {} (Relevant file indices: [{indices}])\n  Description: {}\n",
            a.name, a.description
        ));
        referenced.extend(a.files.iter().copied());
    }
    context.push_str("\nRelevant File Snippets (Referenced by Index and Path):\n");
    context.push_str(&file_context(files, referenced));
    context
}

pub async fn analyze_relationships<L>(
    llm: &L,
    abstractions: &[Abstraction],
    files: &CrawledFiles,
    settings: &StageSettings,
) -> Result<RelationshipMap, StageError>
where
    L: LlmClient + ?Sized,
{
    let context = relationships_context(abstractions, files);
    let prompt = prompts::analyze_relationships(settings, &abstraction_listing(abstractions), &context);
    info!(
        abstractions = abstractions.len(),
        context_bytes = context.len(),
        "Analyzing relationships"
    );

    let prompt = prompt.as_str();
    let count = abstractions.len();
    let map = run_with_retries(&settings.retry, "analyze_relationships", |attempt| async move {
        let reply = llm.complete(prompt, settings.use_cache && attempt == 0).await?;
        debug!(reply_len = reply.len(), "Received relationships reply");
        Ok::<_, StageError>(parse_relationships(&reply, count)?)
    })
    .await?;

    let involved: BTreeSet<usize> = map.details.iter().flat_map(|r| [r.from, r.to]).collect();
    let isolated: Vec<&str> = (0..count)
        .filter(|i| !involved.contains(i))
        .map(|i| abstractions[i].name.as_str())
        .collect();
    if !isolated.is_empty() {
        warn!(?isolated, "Some abstractions take part in no relationship");
    }
    info!(relationships = map.details.len(), "Analyzed relationships");
    Ok(map)
}

/// Validate a relationships reply against `abstraction_count` abstractions.
pub fn parse_relationships(
    reply: &str,
    abstraction_count: usize,
) -> Result<RelationshipMap, ReplyError> {
    let value = parse_yaml_reply(reply)?;
    if !value.is_mapping() {
        return Err(ReplyError::Shape("expected a YAML map with `summary` and `relationships`".into()));
    }
    let summary = required_str(&value, "summary")?;
    let items = value
        .get("relationships")
        .and_then(Value::as_sequence)
        .ok_or_else(|| ReplyError::Shape("`relationships` must be a list".into()))?;

    let mut details = Vec::with_capacity(items.len());
    for item in items {
        let from = item
            .get("from_abstraction")
            .ok_or_else(|| ReplyError::Shape("relationship without `from_abstraction`".into()))?;
        let to = item
            .get("to_abstraction")
            .ok_or_else(|| ReplyError::Shape("relationship without `to_abstraction`".into()))?;
        details.push(Relationship {
            from: parse_index(from, abstraction_count)?,
            to: parse_index(to, abstraction_count)?,
            label: required_str(item, "label")?,
        });
    }
    Ok(RelationshipMap { summary, details })
}
