use anyhow::Result;
use clap::Parser;
use log::info;

use graph_search_cli::cli::{commands, Cli, Commands, Session};
use graph_search_cli::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("graph-search-cli.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting graph-search-cli");

    let config = Config::load(cli.config.as_deref())?;
    let session = Session::start(config, cli.beta)?;

    match cli.command {
        Some(Commands::Token) => commands::display_access_token(&session).await,
        Some(Commands::Whoami) => commands::greet_user(&session).await,
        Some(Commands::Search { term }) => commands::search_graph(&session, &term.join(" ")).await,
        None => commands::run_main_menu(&session).await,
    }
}
