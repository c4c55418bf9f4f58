use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "graph-search-cli")]
#[command(about = "Sign in to Microsoft Graph as yourself and search OneDrive and SharePoint")]
pub struct Cli {
    /// Path to appsettings.toml (defaults to ./appsettings.toml, then the config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Search through the Graph beta endpoint
    #[arg(long, global = true)]
    pub beta: bool,

    /// Without a subcommand an interactive menu is started
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a delegated access token for the configured token scopes
    Token,
    /// Show the signed-in user
    Whoami,
    /// Search OneDrive and SharePoint content
    Search {
        /// Search term or phrase
        #[arg(required = true)]
        term: Vec<String>,
    },
}
