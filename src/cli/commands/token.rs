use anyhow::{Context, Result};
use colored::*;
use log::info;

use crate::cli::session::Session;

/// Print the user's delegated token for downstream Graph requests
pub async fn display_access_token(session: &Session) -> Result<()> {
    let scopes = session.token_scopes();
    info!("Requesting user token for {} scopes", scopes.len());

    let token = session
        .credential
        .get_token(&scopes)
        .await
        .context("Error getting user access token")?;

    println!(
        "{} {}",
        "User access token for downstream api [Microsoft Graph] requests:".bright_green().bold(),
        token.token
    );
    println!(
        "{} {}",
        "Expires:".dimmed(),
        token.expires_on.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
