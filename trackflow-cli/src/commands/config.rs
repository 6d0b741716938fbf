use crate::config::ConfigLoader;
use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file and data paths
    Path,
}

pub fn run(ctx: &Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => show_paths(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let toml_str = toml::to_string_pretty(&ctx.config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths(ctx: &Context) -> Result<()> {
    println!("User config:    {}", ConfigLoader::user_config_path().display());
    println!(
        "Project config: {}",
        ConfigLoader::project_config_path().display()
    );
    println!("Data dir:       {}", ctx.data_dir.display());
    Ok(())
}
