//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;
mod segment;

use anyhow::Result;
use clap::Subcommand;

use crate::api::ApiClient;
use crate::config::Config;
use crate::types::parse_param;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the segments a run can target
    Segments,
    /// Submit a new segment run
    Submit {
        /// Segment category (e.g. lending_whales)
        category: String,

        /// Segment option as KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Keep watching the run until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the latest run of a segment
    Latest {
        /// Segment category
        category: String,

        /// Max result rows to print
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// List recent runs
    List {
        /// Max runs to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a run
    Show {
        /// Run ID or unambiguous prefix
        id: String,

        /// Max result rows to print
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// Follow the latest run of a segment until it finishes
    Watch {
        /// Segment category
        category: String,

        /// Seconds between refreshes
        #[arg(short, long, default_value_t = 3)]
        interval: u64,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.orchestrator_url);

    match command {
        Commands::Segments => segment::list_segments(&client).await,
        Commands::Submit {
            category,
            params,
            watch,
        } => run::submit_run(&client, category, params, watch).await,
        Commands::Latest { category, rows } => run::latest_run(&client, &category, rows).await,
        Commands::List { limit } => run::list_runs(&client, limit).await,
        Commands::Show { id, rows } => run::show_run(&client, &id, rows).await,
        Commands::Watch { category, interval } => {
            run::watch_latest(&client, &category, interval).await
        }
    }
}
