//! Stage 4: one Markdown chapter per abstraction, written in chapter order.
//!
//! Chapters are generated sequentially; every prompt carries the chapters
//! written so far so the LLM can refer back to them consistently.

use crate::abstractions::{file_context, Abstraction};
use crate::config::StageSettings;
use crate::contract::{CrawledFiles, LlmClient, LlmError};
use crate::prompts::{self, ChapterPrompt};
use crate::reply::StageError;
use crate::retry::run_with_retries;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    /// 1-based position in the tutorial.
    pub number: usize,
    /// Index of the abstraction this chapter explains.
    pub abstraction: usize,
    pub title: String,
    pub filename: String,
    pub content: String,
}

/// `NN_safe_name.md`, where every non-alphanumeric character becomes `_`.
pub fn chapter_filename(number: usize, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase();
    format!("{number:02}_{safe}.md")
}

struct PlannedChapter<'a> {
    number: usize,
    abstraction: usize,
    name: &'a str,
    filename: String,
}

impl PlannedChapter<'_> {
    fn link(&self) -> String {
        format!("[{}]({})", self.name, self.filename)
    }
}

pub async fn write_chapters<L>(
    llm: &L,
    order: &[usize],
    abstractions: &[Abstraction],
    files: &CrawledFiles,
    settings: &StageSettings,
) -> Result<Vec<Chapter>, StageError>
where
    L: LlmClient + ?Sized,
{
    let plan: Vec<PlannedChapter> = order
        .iter()
        .filter_map(|&index| abstractions.get(index).map(|a| (index, a)))
        .enumerate()
        .map(|(pos, (index, a))| PlannedChapter {
            number: pos + 1,
            abstraction: index,
            name: a.name.as_str(),
            filename: chapter_filename(pos + 1, &a.name),
        })
        .collect();
    let listing = plan
        .iter()
        .map(|c| format!("{}. {}", c.number, c.link()))
        .collect::<Vec<_>>()
        .join("\n");

    info!(chapters = plan.len(), "Writing chapters");
    let mut written: Vec<Chapter> = Vec::with_capacity(plan.len());
    for (pos, planned) in plan.iter().enumerate() {
        let abstraction = &abstractions[planned.abstraction];
        let previous = pos.checked_sub(1).map(|p| plan[p].link());
        let next = plan.get(pos + 1).map(PlannedChapter::link);
        let code = file_context(files, abstraction.files.iter().copied());
        let so_far = written
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");

        let prompt = prompts::write_chapter(&ChapterPrompt {
            settings,
            chapter_number: planned.number,
            abstraction_name: planned.name,
            abstraction_description: &abstraction.description,
            full_chapter_listing: &listing,
            previous_chapter: previous.as_deref(),
            next_chapter: next.as_deref(),
            file_context: &code,
            previous_chapters_summary: &so_far,
        });
        info!(
            chapter = planned.number,
            name = %planned.name,
            prompt_bytes = prompt.len(),
            "Writing chapter"
        );

        let prompt = prompt.as_str();
        let (number, name) = (planned.number, planned.name);
        let content = run_with_retries(&settings.retry, "write_chapter", |attempt| async move {
            let reply = llm.complete(prompt, settings.use_cache && attempt == 0).await?;
            debug!(chapter = number, reply_len = reply.len(), "Received chapter reply");
            normalize_chapter(&reply, number, name)
        })
        .await?;

        written.push(Chapter {
            number: planned.number,
            abstraction: planned.abstraction,
            title: planned.name.to_string(),
            filename: planned.filename.clone(),
            content,
        });
    }
    info!(chapters = written.len(), "Finished writing chapters");
    Ok(written)
}

/// Strip a wrapping ```` ```markdown ```` fence and make sure the chapter
/// starts with `# Chapter {number}: {name}`.
pub fn normalize_chapter(reply: &str, number: usize, name: &str) -> Result<String, StageError> {
    let mut body = reply.trim();
    for fence in ["```markdown", "```md"] {
        if let Some(inner) = body.strip_prefix(fence).and_then(|b| b.strip_suffix("```")) {
            body = inner.trim();
            break;
        }
    }
    if body.is_empty() {
        return Err(StageError::Llm(LlmError::Empty));
    }

    let heading = format!("# Chapter {number}: {name}");
    let (first, rest) = body.split_once('\n').unwrap_or((body, ""));
    let first = first.trim();
    if first == heading {
        return Ok(body.to_string());
    }
    if first.starts_with("# ") {
        return Ok(format!("{heading}\n{rest}"));
    }
    Ok(format!("{heading}\n\n{body}"))
}
