mod audit;
mod serve;
mod token;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gatekeep::config::{CommonConfig, PathSet};
use gatekeep::server::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about)]
pub struct App {
    #[command(subcommand)]
    pub commands: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Serve(serve::ServeArgs),
    Audit(audit::AuditArgs),
    Token(token::TokenArgs),
    PrintConfig(PrintConfigArgs),
}

impl App {
    pub async fn run(self) -> Result<()> {
        match self.commands {
            Commands::Serve(args) => args.run().await,
            Commands::Audit(args) => args.run(),
            Commands::Token(args) => args.run(),
            Commands::PrintConfig(args) => args.run(),
        }
    }
}

#[derive(Args)]
pub struct ConfigArgs {
    /// The config directory, default: `$GATEKEEP_CONFIG`, then `/etc/gatekeep`
    /// for root, `~/.config/gatekeep` otherwise.
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// The data directory, default: `$GATEKEEP_DATA`, then `/var/lib/gatekeep`
    /// for root, `~/.local/share/gatekeep` otherwise.
    #[arg(long)]
    pub data_path: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn build_path_set(&self) -> Result<PathSet> {
        PathSet::new(self.config_path.clone(), self.data_path.clone())
    }

    pub fn load_server(&self) -> Result<ServerConfig> {
        let ps = self.build_path_set()?;
        ps.load_config("server", ServerConfig::default)
    }
}

/// Print the server configuration in use (JSON) and exit.
#[derive(Args)]
pub struct PrintConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl PrintConfigArgs {
    fn run(&self) -> Result<()> {
        let cfg = self.config.load_server()?;
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        Ok(())
    }
}
