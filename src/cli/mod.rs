use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "chartsage",
    about = "Retrieval-augmented knowledge engine for trade setups",
    version = "0.1.0"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run database migrations
    Migrate,

    /// Show setup and knowledge store statistics
    Stats {
        /// Restrict setup counts to one company
        #[arg(short, long)]
        company: Option<Uuid>,
    },

    /// Run the retrieval pipeline and print the knowledge context
    Query {
        /// Analysis text to find similar past setups for
        #[arg(short, long)]
        text: String,

        /// Restrict matches to one company
        #[arg(short, long)]
        company: Option<Uuid>,
    },

    /// Save a generated trade setup and index it for retrieval
    Save {
        /// Owning company id
        #[arg(long)]
        company: Uuid,

        /// Authoring user id
        #[arg(long)]
        user: Uuid,

        /// Display name of the author
        #[arg(long)]
        user_name: Option<String>,

        /// Source analysis text
        #[arg(long)]
        analysis: String,

        /// Path to the structured setup payload JSON
        #[arg(long)]
        setup: String,
    },

    /// Embed knowledge entries whose embedding is missing
    Backfill {
        /// Maximum number of entries to repair in one run
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// List recent setups for a company
    Setups {
        #[arg(short, long)]
        company: Uuid,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Record user feedback on a setup
    Feedback {
        #[arg(long)]
        company: Uuid,

        #[arg(long)]
        user: Uuid,

        #[arg(long)]
        user_name: Option<String>,

        /// Setup the feedback refers to, if any
        #[arg(long)]
        setup_id: Option<Uuid>,

        #[arg(long)]
        text: String,
    },
}

/// Dispatch a parsed CLI command
pub async fn run(cli: Cli, db: Database, config: Config) -> Result<()> {
    match cli.command {
        Commands::Migrate => commands::migrate(db, config).await,
        Commands::Stats { company } => commands::stats(db.pool, company).await,
        Commands::Query { text, company } => commands::query(db.pool, config, text, company).await,
        Commands::Save {
            company,
            user,
            user_name,
            analysis,
            setup,
        } => commands::save(db.pool, config, company, user, user_name, analysis, setup).await,
        Commands::Backfill { limit } => commands::backfill(db.pool, config, limit).await,
        Commands::Setups { company, limit } => commands::list_setups(db.pool, company, limit).await,
        Commands::Feedback {
            company,
            user,
            user_name,
            setup_id,
            text,
        } => commands::feedback(db.pool, company, user, user_name, setup_id, text).await,
    }
}
