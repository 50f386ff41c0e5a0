use anyhow::{Context, Result};
use testgen_core::pipeline::CacheGate;
use testgen_core::store;
use testgen_core::{TestgenConfig, TicketKey};

use crate::cli::app::TicketArgs;

/// Drop stored test cases; only the store is needed, not the provider.
///
/// The ticket lock only serializes callers in this process. A `serve`
/// instance sharing the same storage directory is not locked out, so an
/// in-flight generation there can still write its set afterwards. Use
/// `POST /tickets/{key}/invalidate` against a running server instead.
pub async fn execute(config: &TestgenConfig, args: TicketArgs) -> Result<usize> {
    let key = TicketKey::new(&args.key);
    let gate = CacheGate::new(store::from_config(&config.storage));

    let removed = gate
        .invalidate(&key)
        .await
        .with_context(|| format!("Failed to invalidate test cases for {}", key))?;

    println!("🗑️  Removed {} stored test cases for {}", removed, key);
    Ok(removed)
}
