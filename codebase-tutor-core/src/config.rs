use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_LANGUAGE: &str = "english";
pub const DEFAULT_MAX_ABSTRACTIONS: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Everything the pipeline needs besides the crawler and the LLM client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialConfig {
    pub project_name: String,
    /// Repository URL shown in `index.md`. `None` for local directories.
    pub source_url: Option<String>,
    pub output_dir: PathBuf,
    pub language: String,
    pub max_abstractions: usize,
    pub use_cache: bool,
    pub retry: RetryPolicy,
}

impl TutorialConfig {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            source_url: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            language: DEFAULT_LANGUAGE.to_string(),
            max_abstractions: DEFAULT_MAX_ABSTRACTIONS,
            use_cache: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Settings shared by all prompting stages.
    pub fn stage_settings(&self) -> StageSettings {
        StageSettings {
            project_name: self.project_name.clone(),
            language: self.language.clone(),
            max_abstractions: self.max_abstractions,
            use_cache: self.use_cache,
            retry: self.retry.clone(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            project = %self.project_name,
            output_dir = %self.output_dir.display(),
            language = %self.language,
            max_abstractions = self.max_abstractions,
            use_cache = self.use_cache,
            "Loaded TutorialConfig"
        );
        debug!(?self, "TutorialConfig loaded (full debug)");
    }
}

/// The subset of [`TutorialConfig`] each LLM stage reads.
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub project_name: String,
    pub language: String,
    pub max_abstractions: usize,
    pub use_cache: bool,
    pub retry: RetryPolicy,
}

impl StageSettings {
    /// True when prompts must ask for output in a language other than English.
    pub fn is_translated(&self) -> bool {
        !self.language.trim().eq_ignore_ascii_case(DEFAULT_LANGUAGE)
    }

    /// Target language with its first letter capitalised, as used in prompts.
    pub fn language_display(&self) -> String {
        let lang = self.language.trim();
        let mut chars = lang.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
