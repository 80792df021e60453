#![doc = "codebase-tutor-core: core logic library for codebase-tutor."]

//! This crate holds the whole tutorial pipeline: crawling a codebase,
//! prompting an LLM about it, validating its replies and writing the
//! resulting Markdown tutorial to disk.
//!
//! The LLM transport lives in the `codebase-tutor` binary crate; here it is
//! only the [`contract::LlmClient`] trait, so every stage can be driven by a
//! mock in tests.
//!
//! # Usage
//! Build a [`contract::Crawler`] (usually [`crawl::SourceCrawler`]) and an [`contract::LlmClient`], then call
//! [`flow::build_tutorial`].

pub mod abstractions;
pub mod cache;
pub mod chapters;
pub mod combine;
pub mod config;
pub mod contract;
pub mod crawl;
pub mod flow;
pub mod mermaid;
pub mod ordering;
pub mod prompts;
pub mod relationships;
pub mod reply;
pub mod retry;
