use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod server;
use cli::{Cli, Commands, commands};

fn main() -> Result<()> {
    // Parse CLI arguments first to get verbosity level
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config_path = cli.config.clone();

    match cli.command {
        Commands::Generate(args) => {
            info!("Generate command: {:?}", args);
            let config = commands::load_config(config_path.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::generate::execute(&config, args, false))?;
        }
        Commands::Regenerate(args) => {
            info!("Regenerate command: {:?}", args);
            let config = commands::load_config(config_path.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::generate::execute(&config, args, true))?;
        }
        Commands::Invalidate(args) => {
            info!("Invalidate command: {:?}", args);
            let config = commands::load_config(config_path.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::invalidate::execute(&config, args))?;
        }
        Commands::Prompt(args) => {
            info!("Prompt command: {:?}", args);
            let config = commands::load_config(config_path.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::prompt::execute(&config, args))?;
        }
        Commands::Serve(args) => {
            info!("Serve command: {:?}", args);
            let config = commands::load_config(config_path.as_deref())?;
            // actix runs its workers on its own system runtime
            actix_web::rt::System::new().block_on(commands::serve::execute(&config, args))?;
        }
        Commands::InitConfig(args) => {
            info!("Init config command: {:?}", args);
            commands::init_config::execute(args)?;
        }
    }

    Ok(())
}
