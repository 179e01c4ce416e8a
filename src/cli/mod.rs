use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cadence",
    about = "Personal productivity tracking & weekly stats service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the API server and the daily snapshot refresher
    Serve,
    /// Rebuild cached weekly snapshots, for one user or for everyone
    Refresh {
        #[arg(long)]
        user: Option<String>,
    },
    Status,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
