use colored::*;

use crate::api::{SearchHit, UserProfile};

pub fn print_greeting(profile: &UserProfile) {
    println!(
        "Hello, {}!",
        profile.display_name.as_deref().unwrap_or_default().bright_white().bold()
    );
    println!("Email: {}", profile.email().unwrap_or_default());
}

pub fn print_search_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("{}", "No results found.".dimmed());
        return;
    }

    for hit in hits {
        println!("{} {}", "DataSource:".bright_blue().bold(), hit.data_source);
        println!("\tTotalHits: {}", hits.len());
        println!("\tIndex: {}", hit.index);
        println!("\tRank: {}", display(&hit.rank.map(|r| r.to_string())));
        println!("\tTitle: {}", display(&hit.title).bright_white());
        println!("\tCreatedByUser: {}", display(&hit.created_by));
        println!("\tLastModifiedByUser: {}", display(&hit.last_modified_by));
        println!("\tSummary: {}", display(&hit.summary).dimmed());
        println!("\tLocation: {}", display(&hit.location).cyan());
    }
}

fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}
