//! `load_config` module: reads the optional YAML config file and merges it with
//! environment variables and command-line flags into the core configuration.
//!
//! Precedence, lowest to highest: built-in defaults, YAML file, environment
//! (`LLM_PROVIDER`, `LLM_MODEL`), command-line flags.
//!
//! # Errors
//! All errors use `anyhow::Error` and mention the config file and whether
//! reading or parsing failed.

use crate::cli::GenerateArgs;
use crate::llm_client::{LlmSettings, Provider};
use anyhow::{anyhow, bail, Result};
use codebase_tutor_core::cache::DEFAULT_CACHE_FILE;
use codebase_tutor_core::combine::check_project_name;
use codebase_tutor_core::config::{TutorialConfig, DEFAULT_LANGUAGE, DEFAULT_MAX_ABSTRACTIONS, DEFAULT_OUTPUT_DIR};
use codebase_tutor_core::crawl::{project_name_from_source, CrawlConfig, CrawlSource};
use codebase_tutor_core::retry::RetryPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_PROVIDER: Provider = Provider::Gemini;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub llm: LlmSection,
    pub crawl: CrawlSection,
    pub output_dir: Option<PathBuf>,
    pub language: Option<String>,
    pub max_abstractions: Option<usize>,
    pub cache_file: Option<PathBuf>,
    pub retry: RetrySection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LlmSection {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable to read the API key from.
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlSection {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub max_file_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub wait_secs: Option<u64>,
}

/// Loads a YAML config file. Every key is optional.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    // An empty file is a valid config with every value defaulted.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    match serde_yaml::from_str(&content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML {:?}: {e}", path_ref))
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Provider and model: environment over YAML over defaults.
pub fn resolve_llm_settings(section: &LlmSection) -> Result<LlmSettings> {
    let provider = match env_non_empty("LLM_PROVIDER").or_else(|| section.provider.clone()) {
        Some(name) => name.parse::<Provider>().map_err(|e| anyhow!(e))?,
        None => DEFAULT_PROVIDER,
    };
    let mut settings = LlmSettings::for_provider(provider);
    if let Some(model) = env_non_empty("LLM_MODEL").or_else(|| section.model.clone()) {
        settings.model = model;
    }
    if let Some(base_url) = &section.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(api_key_env) = &section.api_key_env {
        settings.api_key_env = api_key_env.clone();
    }
    if let Some(max_tokens) = section.max_tokens {
        settings.max_tokens = max_tokens;
    }
    settings.temperature = section.temperature;
    Ok(settings)
}

/// Everything `generate` needs, after merging all configuration layers.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub source: CrawlSource,
    pub crawl: CrawlConfig,
    pub tutorial: TutorialConfig,
    pub llm: LlmSettings,
    pub cache_file: PathBuf,
}

pub fn resolve(args: &GenerateArgs, file: FileConfig) -> Result<ResolvedConfig> {
    let source = match (&args.repo, &args.dir) {
        (Some(url), None) => CrawlSource::Remote {
            url: url.clone(),
            token: args.token.clone().filter(|t| !t.trim().is_empty()),
        },
        (None, Some(dir)) => CrawlSource::Local(dir.clone()),
        _ => bail!("exactly one of --repo or --dir must be given"),
    };

    let defaults = CrawlConfig::default();
    let crawl = CrawlConfig {
        include: if args.include.is_empty() {
            file.crawl.include.unwrap_or(defaults.include)
        } else {
            args.include.clone()
        },
        exclude: if args.exclude.is_empty() {
            file.crawl.exclude.unwrap_or(defaults.exclude)
        } else {
            args.exclude.clone()
        },
        max_file_size: args
            .max_size
            .or(file.crawl.max_file_size)
            .unwrap_or(defaults.max_file_size),
    };

    let max_abstractions = args
        .max_abstractions
        .or(file.max_abstractions)
        .unwrap_or(DEFAULT_MAX_ABSTRACTIONS);
    if max_abstractions == 0 {
        bail!("max_abstractions must be at least 1");
    }

    let project_name = args
        .name
        .clone()
        .unwrap_or_else(|| project_name_from_source(&source));
    check_project_name(&project_name)?;
    let mut tutorial = TutorialConfig::new(project_name);
    tutorial.source_url = source.repo_url().map(str::to_string);
    tutorial.output_dir = args
        .output
        .clone()
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    tutorial.language = args
        .language
        .clone()
        .or(file.language)
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    tutorial.max_abstractions = max_abstractions;
    tutorial.use_cache = !args.no_cache;
    let default_retry = RetryPolicy::default();
    tutorial.retry = RetryPolicy {
        max_attempts: file.retry.max_attempts.unwrap_or(default_retry.max_attempts),
        wait_secs: file.retry.wait_secs.unwrap_or(default_retry.wait_secs),
    };

    Ok(ResolvedConfig {
        source,
        crawl,
        tutorial,
        llm: resolve_llm_settings(&file.llm)?,
        cache_file: file
            .cache_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE)),
    })
}
