//! Parsing the structured part of LLM replies.
//!
//! Every analysis prompt asks for a fenced YAML block. Models often wrap it
//! in prose, so only the first fenced block is parsed. Indices may come back
//! as bare integers or as `"3 # SomeName"` strings.

use crate::contract::LlmError;
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply contains no fenced YAML block")]
    MissingYaml,

    #[error("reply YAML is invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unexpected reply structure: {0}")]
    Shape(String),

    #[error("invalid index {value:?} (must be between 0 and {max})")]
    InvalidIndex { value: String, max: usize },
}

/// Failure of one attempt of an LLM stage: the call itself or its reply.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_-]*)[ \t]*\r?\n(.*?)```").expect("valid fence regex")
    })
}

/// Return the body of the first ```` ```yaml ```` block, falling back to the
/// first untagged fenced block.
pub fn extract_yaml_block(text: &str) -> Result<&str, ReplyError> {
    let mut untagged = None;
    for caps in fence_regex().captures_iter(text) {
        let lang = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        match lang.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => return Ok(body.trim_end()),
            "" if untagged.is_none() => untagged = Some(body.trim_end()),
            _ => {}
        }
    }
    untagged.ok_or(ReplyError::MissingYaml)
}

/// Extract and parse the YAML block of a reply.
pub fn parse_yaml_reply(text: &str) -> Result<Value, ReplyError> {
    let block = extract_yaml_block(text)?;
    Ok(serde_yaml::from_str(block)?)
}

/// Parse an index given as an integer or as `"<int> # comment"`, checking it
/// is below `len`.
pub fn parse_index(value: &Value, len: usize) -> Result<usize, ReplyError> {
    let invalid = |raw: String| ReplyError::InvalidIndex {
        value: raw,
        max: len.saturating_sub(1),
    };
    let index = match value {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| invalid(n.to_string()))?,
        Value::String(s) => s
            .split('#')
            .next()
            .map(str::trim)
            .and_then(|head| head.parse::<usize>().ok())
            .ok_or_else(|| invalid(s.clone()))?,
        other => return Err(invalid(format!("{other:?}"))),
    };
    if index >= len {
        return Err(invalid(index.to_string()));
    }
    Ok(index)
}

/// Read a required string field from a YAML mapping.
pub fn required_str(map: &Value, field: &str) -> Result<String, ReplyError> {
    match map.get(field) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(ReplyError::Shape(format!("field `{field}` must be a string"))),
        None => Err(ReplyError::Shape(format!("missing field `{field}`"))),
    }
}
