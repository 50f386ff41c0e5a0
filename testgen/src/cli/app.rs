use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use testgen_core::GenerationOptions;

#[derive(Parser, Debug)]
#[command(
    name = "testgen",
    version,
    about = "Testgen - Generate manual test cases from issue-tracker tickets",
    long_about = "Testgen fetches a ticket, asks a text-generation provider for test cases, validates and de-duplicates the result, and stores it per ticket. Run it once from the command line or as an HTTP service."
)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate test cases for a ticket, reusing stored ones when present
    #[command(about = "Generate test cases for a ticket")]
    Generate(GenerateArgs),

    /// Discard stored test cases and generate a fresh set
    #[command(about = "Regenerate test cases for a ticket, replacing the stored set")]
    Regenerate(GenerateArgs),

    /// Drop stored test cases after a ticket changed
    #[command(about = "Invalidate stored test cases for a ticket")]
    Invalidate(TicketArgs),

    /// Show the prompt that would be sent, without calling the provider
    #[command(about = "Print the generation prompt for a ticket")]
    Prompt(PromptArgs),

    /// Run the HTTP API
    #[command(about = "Serve the generation API over HTTP")]
    Serve(ServeArgs),

    /// Write a configuration file with every default spelled out
    #[command(name = "init-config", about = "Write the default configuration file")]
    InitConfig(InitConfigArgs),
}

/// Scenario flags shared by every command that builds a prompt
#[derive(Args, Debug, Clone, Default)]
pub struct ScenarioFlags {
    /// Ask for security test cases
    #[arg(long)]
    pub security: bool,

    /// Ask for performance test cases
    #[arg(long)]
    pub performance: bool,

    /// Leave out regression checks of neighbouring behaviour
    #[arg(long)]
    pub no_regression: bool,
}

impl ScenarioFlags {
    pub fn options(&self, force: bool) -> GenerationOptions {
        GenerationOptions {
            include_regression: !self.no_regression,
            include_security: self.security,
            include_performance: self.performance,
            force,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Ticket key, e.g. PROJ-123
    pub key: String,

    #[command(flatten)]
    pub scenarios: ScenarioFlags,

    /// Ignore stored test cases
    #[arg(short, long)]
    pub force: bool,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TicketArgs {
    /// Ticket key, e.g. PROJ-123
    pub key: String,
}

#[derive(Args, Debug)]
pub struct PromptArgs {
    /// Ticket key, e.g. PROJ-123
    pub key: String,

    #[command(flatten)]
    pub scenarios: ScenarioFlags,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, overrides the configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, overrides the configuration
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the file
    #[arg(default_value = "testgen.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
