//! High-level pipeline: crawl → abstractions → relationships → order →
//! chapters → combine.
//!
//! [`build_tutorial`] runs every stage strictly in sequence, each in its own
//! tracing span tagged with a per-run id, and stops at the first failing
//! stage. LLM stages retry internally according to the configured
//! [`crate::retry::RetryPolicy`]; crawling and writing are not retried.
//!
//! # Callable From
//! - The `codebase-tutor` CLI
//! - Integration tests with [`crate::contract::MockCrawler`] and
//!   [`crate::contract::MockLlmClient`]

use crate::abstractions::identify_abstractions;
use crate::chapters::write_chapters;
use crate::combine::{combine_tutorial, CombineError};
use crate::config::TutorialConfig;
use crate::contract::{CrawlError, Crawler, LlmClient};
use crate::ordering::order_chapters;
use crate::relationships::analyze_relationships;
use crate::reply::StageError;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error("writing the tutorial failed: {0}")]
    Combine(#[from] CombineError),
}

fn stage_failed(stage: &'static str) -> impl FnOnce(StageError) -> FlowError {
    move |source| {
        error!(stage, error = %source, "[FLOW][ERROR] Stage failed");
        FlowError::Stage { stage, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterReport {
    pub number: usize,
    pub title: String,
    pub filename: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialReport {
    pub project_name: String,
    /// Directory holding `index.md` and the chapters.
    pub output_path: PathBuf,
    pub files_crawled: usize,
    pub chapters: Vec<ChapterReport>,
}

pub async fn build_tutorial<C, L>(
    config: &TutorialConfig,
    crawler: &C,
    llm: &L,
) -> Result<TutorialReport, FlowError>
where
    C: Crawler + ?Sized,
    L: LlmClient + ?Sized,
{
    let run_id = Uuid::new_v4();
    info!(%run_id, project = %config.project_name, "[FLOW] Starting tutorial generation");
    let settings = config.stage_settings();

    let files = crawler
        .crawl()
        .instrument(info_span!("crawl", %run_id))
        .await
        .map_err(|e| {
            error!(error = %e, "[FLOW][ERROR] Crawl failed");
            FlowError::Crawl(e)
        })?;
    info!(
        files = files.len(),
        bytes = files.total_bytes(),
        "[FLOW] Crawl succeeded"
    );

    let abstractions = identify_abstractions(llm, &files, &settings)
        .instrument(info_span!("identify_abstractions", %run_id))
        .await
        .map_err(stage_failed("identify_abstractions"))?;

    let relationships = analyze_relationships(llm, &abstractions, &files, &settings)
        .instrument(info_span!("analyze_relationships", %run_id))
        .await
        .map_err(stage_failed("analyze_relationships"))?;

    let order = order_chapters(llm, &abstractions, &relationships, &settings)
        .instrument(info_span!("order_chapters", %run_id))
        .await
        .map_err(stage_failed("order_chapters"))?;

    let chapters = write_chapters(llm, &order, &abstractions, &files, &settings)
        .instrument(info_span!("write_chapters", %run_id))
        .await
        .map_err(stage_failed("write_chapters"))?;

    let output_path = {
        let _span = info_span!("combine_tutorial", %run_id).entered();
        combine_tutorial(
            &config.output_dir,
            &config.project_name,
            config.source_url.as_deref(),
            &abstractions,
            &relationships,
            &chapters,
        )?
    };

    info!(
        %run_id,
        output = %output_path.display(),
        chapters = chapters.len(),
        "[FLOW] Tutorial generation complete"
    );
    Ok(TutorialReport {
        project_name: config.project_name.clone(),
        output_path,
        files_crawled: files.len(),
        chapters: chapters
            .into_iter()
            .map(|c| ChapterReport {
                number: c.number,
                title: c.title,
                filename: c.filename,
            })
            .collect(),
    })
}
