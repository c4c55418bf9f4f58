use anyhow::{Context, Result};
use colored::*;

use crate::cli::session::Session;
use crate::cli::ui;

/// Greet the signed-in user by name
pub async fn greet_user(session: &Session) -> Result<()> {
    let profile = session
        .graph
        .current_user()
        .await
        .context("Error getting user")?;

    match profile {
        Some(profile) => ui::print_greeting(&profile),
        None => println!("{}", "Not signed in.".bright_red()),
    }
    Ok(())
}
