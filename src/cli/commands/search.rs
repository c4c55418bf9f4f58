use anyhow::{Context, Result};
use colored::*;

use crate::cli::session::Session;
use crate::cli::ui::{self, with_spinner};

pub async fn search_graph(session: &Session, term: &str) -> Result<()> {
    let term = term.trim();
    if term.is_empty() {
        anyhow::bail!("No search term or phrase provided");
    }

    // Sign in before the spinner takes over the console
    session
        .credential
        .get_token(&session.config.app_settings.graph_user_scopes)
        .await
        .context("Error signing in for search")?;

    let hits = with_spinner(format!("Searching for '{}'...", term), session.graph.search(term))
        .await
        .context("Search request failed")?;

    println!(
        "{} {} ({:?} API, first page only)",
        "Results:".bright_blue().bold(),
        hits.len(),
        session.graph.version()
    );
    ui::print_search_hits(&hits);
    Ok(())
}
