pub mod generate;
pub mod init_config;
pub mod invalidate;
pub mod prompt;
pub mod serve;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use testgen_core::{Orchestrator, TestgenConfig};
use tracing::debug;

/// Picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "testgen.toml";

pub fn load_config(path: Option<&Path>) -> Result<TestgenConfig> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    let path = path.or_else(|| local.exists().then_some(local.as_path()));

    match path {
        Some(path) => debug!("Loading configuration from {}", path.display()),
        None => debug!("No configuration file, using defaults"),
    }
    TestgenConfig::load_or_default(path)
}

pub fn build_orchestrator(config: &TestgenConfig) -> Result<Orchestrator> {
    Orchestrator::from_config(config).context("Failed to set up the generation pipeline")
}
