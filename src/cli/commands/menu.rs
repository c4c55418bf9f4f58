//! Interactive menu loop

use anyhow::Result;
use colored::*;
use dialoguer::{Input, Select};
use is_terminal::IsTerminal;
use log::{info, warn};

use super::{search, token, whoami};
use crate::cli::session::Session;

#[derive(Debug, Clone, Copy)]
enum MainMenuOption {
    Exit,
    DisplayToken,
    Search,
}

impl std::fmt::Display for MainMenuOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainMenuOption::Exit => write!(f, "{} - {}", "Exit".bright_red().bold(), "Leave the application".dimmed()),
            MainMenuOption::DisplayToken => write!(f, "{} - {}", "Display access token".bright_yellow().bold(), "Print your delegated Graph token".dimmed()),
            MainMenuOption::Search => write!(f, "{} - {}", "Search graph".bright_green().bold(), "Search OneDrive and SharePoint".dimmed()),
        }
    }
}

/// Greet the user, then loop over the menu until Exit
pub async fn run_main_menu(session: &Session) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("Interactive mode needs a terminal; use the token, whoami or search subcommands instead");
    }

    println!("{}", "Start Microsoft Graph OBO User Search Service".bright_blue().bold());
    println!();

    if let Err(e) = whoami::greet_user(session).await {
        println!("{} {:#}", "✗".bright_red().bold(), e);
    }

    let options = [MainMenuOption::Exit, MainMenuOption::DisplayToken, MainMenuOption::Search];

    loop {
        println!();
        let selection = Select::new()
            .with_prompt("Please choose one of the following options")
            .items(&options)
            .default(0)
            .interact()?;

        let result = match options[selection] {
            MainMenuOption::Exit => {
                println!("Goodbye..");
                info!("Exiting menu");
                return Ok(());
            }
            MainMenuOption::DisplayToken => token::display_access_token(session).await,
            MainMenuOption::Search => {
                let term: String = Input::new()
                    .with_prompt("Enter search term or phrase")
                    .allow_empty(true)
                    .interact_text()?;
                search::search_graph(session, &term).await
            }
        };

        // A failed action never ends the session
        if let Err(e) = result {
            warn!("Menu action failed: {:#}", e);
            println!("{} {}", "✗".bright_red().bold(), format!("{:#}", e).red());
        }
    }
}
