//! studyspark CLI: import decks, review due cards, and track mastery.

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "studyspark",
    version,
    about = "Spaced-repetition flashcard scheduler"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example deck
    Init,

    /// Validate deck TOML files
    Validate {
        /// Path to deck file or directory
        #[arg(long)]
        deck: PathBuf,
    },

    /// Import decks as new cards
    Import {
        /// Path to deck file or directory
        #[arg(long)]
        deck: PathBuf,

        /// Owner of the imported cards (defaults to the deck owner, then config)
        #[arg(long)]
        owner: Option<String>,
    },

    /// List cards due for review
    Due {
        #[arg(long)]
        owner: Option<String>,

        /// Maximum cards to list
        #[arg(long)]
        limit: Option<usize>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Record the outcome of one review
    #[command(group(ArgGroup::new("outcome").required(true).args(["correct", "incorrect"])))]
    Review {
        /// Card id
        #[arg(long)]
        card: String,

        #[arg(long)]
        correct: bool,

        #[arg(long)]
        incorrect: bool,

        /// Seconds spent on the card
        #[arg(long)]
        time: Option<f64>,
    },

    /// Show mastery statistics
    Stats {
        /// Restrict to one owner (default: all cards)
        #[arg(long)]
        owner: Option<String>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Save a snapshot as JSON (to the configured output directory if no path is given)
        #[arg(long, num_args = 0..=1)]
        save: Option<Option<PathBuf>>,
    },

    /// Compare two stats snapshots
    Compare {
        /// Baseline snapshot JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current snapshot JSON
        #[arg(long)]
        current: PathBuf,

        /// Regression threshold in mastery points
        #[arg(long, default_value = "5.0")]
        threshold: f64,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "studyspark=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { deck } => commands::validate::execute(deck),
        Commands::Import { deck, owner } => commands::import::execute(deck, owner, config).await,
        Commands::Due {
            owner,
            limit,
            format,
        } => commands::due::execute(owner, limit, format, config).await,
        Commands::Review {
            card,
            correct,
            incorrect: _,
            time,
        } => commands::review::execute(card, correct, time, config).await,
        Commands::Stats {
            owner,
            format,
            save,
        } => commands::stats::execute(owner, format, save, config).await,
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
