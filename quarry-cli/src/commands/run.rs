//! Run command handlers
//!
//! Submitting runs, listing them and printing their outcome.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use colored::*;
use quarry_core::domain::run::{Run, RunStatus};
use quarry_core::dto::run::{RunSummary, SubmitRun};

use crate::api::ApiClient;
use crate::id_resolver::resolve_run_id;
use crate::types::IdOrPrefix;

const WATCH_INTERVAL_SECS: u64 = 3;

/// Submit a run and optionally follow it
pub async fn submit_run(
    client: &ApiClient,
    category: String,
    params: Vec<(String, String)>,
    watch: bool,
) -> Result<()> {
    let parameters: HashMap<String, serde_json::Value> = params
        .into_iter()
        .map(|(key, value)| (key, serde_json::Value::String(value)))
        .collect();

    let submitted = client
        .submit_run(SubmitRun {
            category,
            parameters,
        })
        .await?;

    println!("{}", "✓ Run submitted".green().bold());
    println!("  ID:        {}", submitted.run_id.to_string().cyan());
    println!("  Remote ID: {}", submitted.remote_run_id.dimmed());

    if watch {
        println!();
        let run = follow(WATCH_INTERVAL_SECS, || client.get_run(submitted.run_id)).await?;
        print_run_details(&run, 10);
    }

    Ok(())
}

/// Show the latest run of a category
pub async fn latest_run(client: &ApiClient, category: &str, rows: usize) -> Result<()> {
    let run = client.latest_run(category).await?;
    print_run_details(&run, rows);
    Ok(())
}

/// List recent runs
pub async fn list_runs(client: &ApiClient, limit: usize) -> Result<()> {
    let runs = client.list_runs(limit).await?;

    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
    } else {
        println!("{}", format!("Found {} run(s):", runs.len()).bold());
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

/// Show a single run by ID or prefix
pub async fn show_run(client: &ApiClient, id: &str, rows: usize) -> Result<()> {
    let id_or_prefix = IdOrPrefix::parse(id);
    let uuid = resolve_run_id(client, &id_or_prefix).await?;

    let run = client.get_run(uuid).await?;
    print_run_details(&run, rows);

    Ok(())
}

/// Follow the latest run of a category until it is terminal
pub async fn watch_latest(client: &ApiClient, category: &str, interval: u64) -> Result<()> {
    let run = follow(interval, || client.latest_run(category)).await?;
    print_run_details(&run, 10);
    Ok(())
}

/// Re-reads a run until it reaches a terminal status, printing each change
async fn follow<F, Fut>(interval: u64, mut fetch: F) -> Result<Run>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Run>>,
{
    let mut last: Option<RunStatus> = None;

    loop {
        let run = fetch().await?;

        if last != Some(run.status) {
            println!(
                "{} {} {}",
                chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                run.id.to_string().dimmed(),
                colorize_status(run.status)
            );
            last = Some(run.status);
        }

        if run.status.is_terminal() {
            println!();
            return Ok(run);
        }

        tokio::time::sleep(Duration::from_secs(interval.max(1))).await;
    }
}

/// Print a run summary line block
fn print_run_summary(run: &RunSummary) {
    println!(
        "  {} Run {} {}",
        "▸".cyan(),
        run.id.to_string().dimmed(),
        colorize_status(run.status)
    );
    println!("    Segment: {} ({})", run.category, run.label);
    println!(
        "    Created: {}",
        run.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(count) = run.row_count {
        println!("    Rows:    {}", count);
    }
    if let Some(error) = &run.error_message {
        println!("    Error:   {}", error.red());
    }
    println!();
}

/// Print detailed run information
fn print_run_details(run: &Run, max_rows: usize) {
    println!("{}", "Run Details:".bold());
    println!("  ID:        {}", run.id.to_string().cyan());
    println!("  Segment:   {} ({})", run.category, run.label);
    println!("  Status:    {}", colorize_status(run.status));
    println!("  Created:   {}", run.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(remote) = &run.remote_run_id {
        println!("  Remote ID: {}", remote.dimmed());
    }

    if !run.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        for (key, value) in &run.parameters {
            println!("  {} = {}", key.cyan(), value);
        }
    }

    if let Some(error) = &run.error_message {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    if let Some(rows) = &run.result {
        println!("\n{}", format!("Result ({} row(s)):", rows.len()).bold());
        for row in rows.iter().take(max_rows) {
            match serde_json::to_string(row) {
                Ok(line) => println!("  {}", line),
                Err(_) => println!("  {:?}", row),
            }
        }
        if rows.len() > max_rows {
            println!(
                "  {}",
                format!("... {} more", rows.len() - max_rows).dimmed()
            );
        }
    }
}

/// Colorize run status for display
fn colorize_status(status: RunStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        RunStatus::Pending => status_str.yellow(),
        RunStatus::Running => status_str.cyan(),
        RunStatus::Success => status_str.green(),
        RunStatus::Failed => status_str.red(),
    }
}
