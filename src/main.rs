//! coursebot CLI entry point.

use anyhow::Result;
use clap::Parser;
use coursebot::cli::{commands, Cli, Commands};
use coursebot::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging: -v flags win over the configured level, RUST_LOG over both
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("coursebot={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ingest { dir, course } => {
            commands::run_ingest(dir, course, settings).await?;
        }

        Commands::Ask {
            question,
            course,
            top_k,
            no_generate,
            json,
        } => {
            commands::run_ask(question, course, *top_k, *no_generate, *json, settings).await?;
        }

        Commands::Search { query, course, limit } => {
            commands::run_search(query, course, *limit, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Delete { course, source, chunk } => {
            commands::run_delete(course, source.clone(), chunk.clone(), settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
