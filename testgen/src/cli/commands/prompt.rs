use anyhow::{Context, Result};
use testgen_core::test_gen::PromptBuilder;
use testgen_core::ticket::{self, TicketSource};
use testgen_core::{TestgenConfig, TicketKey};

use crate::cli::app::PromptArgs;

/// Print the prompt for a ticket. Needs ticket access but no provider key.
pub async fn execute(config: &TestgenConfig, args: PromptArgs) -> Result<()> {
    let key = TicketKey::new(&args.key);
    let source = ticket::from_config(&config.tickets).context("Failed to set up the ticket source")?;
    let ticket = source
        .get_ticket_by_key(&key)
        .await
        .with_context(|| format!("Failed to fetch ticket {}", key))?;

    let prompt = PromptBuilder::new().build(&ticket, &args.scenarios.options(false));

    println!("--- system ---\n{}\n", prompt.system);
    println!("--- user ---\n{}", prompt.user);
    Ok(())
}
