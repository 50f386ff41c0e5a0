use anyhow::{Context, Result};
use testgen_core::TestgenConfig;
use tracing::info;

use crate::cli::app::ServeArgs;

pub async fn execute(config: &TestgenConfig, args: ServeArgs) -> Result<()> {
    let orchestrator = super::build_orchestrator(config)?;
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    info!("Starting testgen {} on {}:{}", testgen_core::VERSION, host, port);
    crate::server::run(orchestrator, &host, port)
        .await
        .with_context(|| format!("HTTP server on {}:{} failed", host, port))
}
