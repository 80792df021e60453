//! Stage 5: write `index.md` and the chapter files to disk.

use crate::abstractions::Abstraction;
use crate::chapters::Chapter;
use crate::mermaid;
use crate::relationships::RelationshipMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const ATTRIBUTION: &str = "Generated by [AI Codebase Knowledge Builder](https://github.com/The-Pocket/Tutorial-Codebase-Knowledge)";

#[derive(Debug, Error)]
pub enum CombineError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project name {0:?}: it must be a single directory name")]
    InvalidProjectName(String),
}

/// The project name becomes one directory under the output directory, so it
/// must not be empty, `.`/`..`, or contain a path separator.
pub fn check_project_name(project_name: &str) -> Result<(), CombineError> {
    let name = project_name.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        error!(project = project_name, "Project name is not a plain directory name");
        return Err(CombineError::InvalidProjectName(project_name.to_string()));
    }
    Ok(())
}

fn footer() -> String {
    format!("\n\n---\n\n{ATTRIBUTION}")
}

fn write_file(path: &Path, content: &str) -> Result<(), CombineError> {
    std::fs::write(path, content).map_err(|source| {
        error!(path = %path.display(), error = %source, "Failed to write tutorial file");
        CombineError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Render `index.md`.
pub fn render_index(
    project_name: &str,
    repo_url: Option<&str>,
    abstractions: &[Abstraction],
    relationships: &RelationshipMap,
    chapters: &[Chapter],
) -> String {
    let mut index = format!("# Tutorial: {project_name}\n\n{}\n\n", relationships.summary.trim());
    if let Some(url) = repo_url {
        index.push_str(&format!("**Source Repository:** [{url}]({url})\n\n"));
    }
    let diagram = mermaid::relationship_flowchart(abstractions, relationships);
    index.push_str(&format!("```mermaid\n{diagram}\n```\n\n"));
    index.push_str("## Chapters\n\n");
    for chapter in chapters {
        index.push_str(&format!(
            "{}. [{}]({})\n",
            chapter.number, chapter.title, chapter.filename
        ));
    }
    index.push_str(&footer());
    index
}

/// Write the tutorial into `<output_dir>/<project_name>/` and return that directory.
pub fn combine_tutorial(
    output_dir: &Path,
    project_name: &str,
    repo_url: Option<&str>,
    abstractions: &[Abstraction],
    relationships: &RelationshipMap,
    chapters: &[Chapter],
) -> Result<PathBuf, CombineError> {
    check_project_name(project_name)?;
    let target = output_dir.join(project_name);
    std::fs::create_dir_all(&target).map_err(|source| {
        error!(path = %target.display(), error = %source, "Failed to create output directory");
        CombineError::Io {
            path: target.clone(),
            source,
        }
    })?;
    info!(path = %target.display(), "Combining tutorial");

    let index = render_index(project_name, repo_url, abstractions, relationships, chapters);
    write_file(&target.join("index.md"), &index)?;
    debug!(bytes = index.len(), "Wrote index.md");

    for chapter in chapters {
        let (mut content, problems) = mermaid::repair_markdown_diagrams(&chapter.content);
        if !problems.is_empty() {
            warn!(chapter = %chapter.filename, ?problems, "Chapter contains Mermaid problems");
        }
        if !content.trim_end().ends_with(ATTRIBUTION) {
            content.push_str(&footer());
        }
        write_file(&target.join(&chapter.filename), &content)?;
        debug!(file = %chapter.filename, bytes = content.len(), "Wrote chapter");
    }

    info!(
        path = %target.display(),
        chapters = chapters.len(),
        "Tutorial written"
    );
    Ok(target)
}
