use anyhow::{Result, bail};
use testgen_core::TestgenConfig;
use tracing::info;

use crate::cli::app::InitConfigArgs;

pub fn execute(args: InitConfigArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        bail!("{} already exists, pass --force to overwrite it", args.path.display());
    }

    TestgenConfig::default().save(&args.path)?;
    info!("Wrote default configuration to {}", args.path.display());
    println!("📝 Wrote {}", args.path.display());
    println!("   Set OPENAI_API_KEY, JIRA_EMAIL and JIRA_API_TOKEN, or edit the *_env entries.");
    Ok(())
}
