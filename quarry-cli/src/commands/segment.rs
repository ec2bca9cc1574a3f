//! Segment command handlers

use anyhow::Result;
use colored::*;

use crate::api::ApiClient;

/// Print the segment catalog
pub async fn list_segments(client: &ApiClient) -> Result<()> {
    let segments = client.list_segments().await?;

    println!("{}", format!("{} segment(s):", segments.len()).bold());
    println!();
    for segment in segments {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            segment.category.to_string().bold(),
            format!("({})", segment.label).dimmed()
        );
        println!("    {}", segment.tagline);
        for option in &segment.options {
            println!(
                "    --param {}=<{}>  {} [default: {}]",
                option.key.cyan(),
                option.choices.join("|"),
                option.label.dimmed(),
                option.default
            );
        }
        println!();
    }

    Ok(())
}
