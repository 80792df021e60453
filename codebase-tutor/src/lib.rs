pub mod cli;
pub mod llm_client;
pub mod load_config;

pub use cli::{run, Cli, Commands};
