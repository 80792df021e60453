use super::CrawlConfig;
use crate::contract::CrawlError;
use glob::Pattern;
use tracing::debug;

/// Compiled include/exclude globs.
///
/// Globs are matched against the path relative to the crawl root, with `/`
/// separators. `*` crosses directory boundaries, so `*test*` also rejects
/// `src/tests/helpers.py`. Include globs additionally match the bare file
/// name, so `Makefile` catches `tools/Makefile`.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, CrawlError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| CrawlError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

impl FileFilter {
    pub fn new(config: &CrawlConfig) -> Result<Self, CrawlError> {
        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
        })
    }

    /// Add more exclude globs, e.g. from a `.gitignore`.
    pub fn with_extra_excludes(mut self, patterns: &[String]) -> Result<Self, CrawlError> {
        self.exclude.extend(compile(patterns)?);
        Ok(self)
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(rel_path))
    }

    pub fn is_included(&self, rel_path: &str) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.include
            .iter()
            .any(|p| p.matches(rel_path) || p.matches(file_name))
    }

    /// Whether a file at `rel_path` should be read.
    pub fn accepts(&self, rel_path: &str) -> bool {
        let accepted = self.is_included(rel_path) && !self.is_excluded(rel_path);
        if !accepted {
            debug!(path = rel_path, "File rejected by include/exclude patterns");
        }
        accepted
    }

    /// Whether a whole directory can be skipped without descending into it.
    pub fn prunes_dir(&self, rel_dir: &str) -> bool {
        if rel_dir.is_empty() {
            return false;
        }
        let with_slash = format!("{rel_dir}/");
        self.exclude
            .iter()
            .any(|p| p.matches(rel_dir) || p.matches(&with_slash))
    }
}

/// Translate `.gitignore` lines into exclude globs.
///
/// Negations (`!pattern`) are not supported and are skipped. A pattern
/// without a slash applies at any depth; a trailing slash limits it to
/// directories.
pub fn gitignore_patterns(content: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let dir_only = line.ends_with('/');
        let body = line.trim_end_matches('/');
        let anchored = body.starts_with('/') || body.contains('/');
        let body = body.trim_start_matches('/');
        if body.is_empty() {
            continue;
        }
        let mut push = |p: String| {
            if dir_only {
                patterns.push(format!("{p}/*"));
            } else {
                patterns.push(format!("{p}/*"));
                patterns.push(p);
            }
        };
        push(body.to_string());
        if !anchored {
            push(format!("*/{body}"));
        }
    }
    patterns
}
