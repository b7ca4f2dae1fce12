use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nakama::config::{get_config, CliArgs, Config};
use nakama::db::{self, DbPool};
use nakama::pipeline::PipelineContext;
use nakama::{repo, telemetry};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

mod commands;
mod output;

use commands::card::CardCommands;
use commands::pipeline::PipelineCommands;
use commands::user::UserCommands;
use output::{OutputConfig, OutputFormat};

/// Command-line administration for the Nakama card store
#[derive(Parser, Debug)]
#[clap(name = "nakama-cli", version)]
struct Cli {
    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Print only IDs or counts
    #[clap(short, long, global = true)]
    quiet: bool,

    #[clap(flatten)]
    config: CliArgs,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a card pipeline or one of its steps
    #[clap(subcommand)]
    Pipeline(PipelineCommands),
    /// Manage users
    #[clap(subcommand)]
    User(UserCommands),
    /// Inspect cards
    #[clap(subcommand)]
    Card(CardCommands),
    /// Import cards and users from CSV
    Import {
        /// Card CSV with the external column headers
        #[clap(long)]
        cards: Option<PathBuf>,
        /// User CSV with USER_WHITELIST and PASSWORD columns
        #[clap(long)]
        users: Option<PathBuf>,
        /// CSV whose first column lists admin usernames
        #[clap(long)]
        admins: Option<PathBuf>,
    },
    /// Export the card table to CSV
    Export {
        path: PathBuf,
    },
    /// Print the bcrypt hash of a password
    HashPassword {
        password: String,
    },
}

fn open_pool(config: &Config) -> Result<DbPool> {
    let pool = db::init_pool(&config.database_url)?;
    let mut conn = pool.get().context("Failed to open the database")?;
    db::run_migrations(&mut conn)?;
    drop(conn);
    Ok(pool)
}

async fn run(command: Commands, config: Config, output_config: &OutputConfig) -> Result<()> {
    match command {
        Commands::HashPassword { password } => {
            println!("{}", repo::hash_password(&password)?);
            Ok(())
        }
        Commands::Pipeline(cmd) => {
            let pool = open_pool(&config)?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to build the HTTP client")?;
            let ctx = PipelineContext {
                pool: Arc::new(pool),
                config: Arc::new(config),
                http,
            };
            commands::pipeline::execute(&ctx, cmd, output_config).await
        }
        Commands::User(cmd) => commands::user::execute(&open_pool(&config)?, cmd, output_config),
        Commands::Card(cmd) => commands::card::execute(&open_pool(&config)?, cmd, output_config),
        Commands::Import { cards, users, admins } => {
            commands::transfer::import(&open_pool(&config)?, cards, users, admins, output_config)
        }
        Commands::Export { path } => commands::transfer::export(&open_pool(&config)?, &path, output_config),
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let output_config = OutputConfig {
        format: cli.format,
        quiet: cli.quiet,
    };

    let config = telemetry::with_bootstrap_logging(|| get_config(cli.config));
    let _log_guard = match telemetry::init_tracing(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };
    config.log_summary();

    if let Err(e) = run(cli.command, config, &output_config).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
