//! ConcreteIQ CLI
//!
//! Predicts concrete compressive strength from mix designs, either one mix
//! at a time or in batches from CSV, and manages prediction history on a
//! running server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, history, model, predict};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ConcreteIQ CLI
#[derive(Parser)]
#[command(name = "concreteiq")]
#[command(author, version, about = "Concrete compressive strength predictor", long_about = None)]
pub struct Cli {
    /// Model artifact, a .json manifest or .onnx model (can also be set via CONCRETEIQ_ARTIFACT)
    #[arg(long, global = true, env = "CONCRETEIQ_ARTIFACT")]
    pub artifact: Option<String>,

    /// Server URL for history commands (can also be set via CONCRETEIQ_API_URL)
    #[arg(long, global = true, env = "CONCRETEIQ_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict strength for a single mix design
    Predict(predict::MixArgs),

    /// Predict strength for every mix in a CSV file
    Batch {
        /// Input CSV with one mix per row
        input: PathBuf,

        /// Output CSV path (defaults to <input>_predictions.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Write the batch CSV template
    Template {
        /// Output file path (prints to stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show model artifact information
    Model,

    /// Prediction history on a running server
    #[command(subcommand)]
    History(HistoryCommands),
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Show recent predictions
    Show {
        /// Number of predictions to show (server default if not specified)
        #[arg(long, short)]
        limit: Option<usize>,

        /// Session id
        #[arg(long, env = "CONCRETEIQ_SESSION")]
        session: Option<String>,
    },

    /// Clear all predictions of a session
    Clear {
        /// Session id
        #[arg(long, env = "CONCRETEIQ_SESSION")]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let config = config::Config::load()?;
    let format = config.format(cli.format);

    match cli.command {
        Commands::Predict(args) => {
            let engine = commands::load_engine(&config.artifact(cli.artifact))?;
            predict::run(&engine, &args, format)?;
        }
        Commands::Batch { input, output } => {
            let engine = commands::load_engine(&config.artifact(cli.artifact))?;
            batch::run(&engine, &input, output, format)?;
        }
        Commands::Template { output } => {
            batch::write_template(output)?;
        }
        Commands::Model => {
            let engine = commands::load_engine(&config.artifact(cli.artifact))?;
            model::show(&engine, format)?;
        }
        Commands::History(history_cmd) => {
            let api_url = config.api_url(cli.api_url);
            match history_cmd {
                HistoryCommands::Show { limit, session } => {
                    let client = client::ApiClient::new(&api_url)?
                        .with_session(session.or_else(|| config.session.clone()));
                    history::show(&client, limit, format).await?;
                }
                HistoryCommands::Clear { session } => {
                    let client = client::ApiClient::new(&api_url)?
                        .with_session(session.or_else(|| config.session.clone()));
                    history::clear(&client, format).await?;
                }
            }
        }
    }

    Ok(())
}
