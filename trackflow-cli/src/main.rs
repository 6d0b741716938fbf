use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "trackflow", about = "Marketing attribution over tracked touchpoints")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the data directory holding the touchpoint store
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run attribution for a converted lead or deal
    Attribute(commands::attribute::AttributeArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Import touchpoints from a JSON file
    Import(commands::import::ImportArgs),
    /// List attribution models
    Models,
    /// Aggregate attributed credit by channel or campaign
    Report(commands::report::ReportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::Context::load(cli.data_dir)?;

    match cli.command {
        Commands::Attribute(args) => commands::attribute::run(&ctx, args).await,
        Commands::Config(args) => commands::config::run(&ctx, args),
        Commands::Import(args) => commands::import::run(&ctx, args).await,
        Commands::Models => commands::models::run(&ctx),
        Commands::Report(args) => commands::report::run(&ctx, args).await,
    }
}
