use clap::ValueEnum;
use nakama::models::{Card, CardField, User};
use nakama::pipeline::{PipelineReport, StepOutcome};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs or counts)
    pub quiet: bool,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn text(card: &Card, field: CardField) -> &str {
    card.get(field).unwrap_or("-")
}

/// Prints a list of cards in the specified format
pub fn print_cards(cards: &[Card], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if cards.is_empty() {
                if !config.quiet {
                    println!("No cards found.");
                }
                return;
            }
            if config.quiet {
                for card in cards {
                    println!("{}", card.get_card_id());
                }
                return;
            }
            let max_id = cards.iter().map(|c| c.get_card_id().len()).max().unwrap_or(2);
            let max_owner = cards
                .iter()
                .map(|c| text(c, CardField::Owner).len())
                .max()
                .unwrap_or(5)
                .max(5);
            println!(
                "{:<id_w$}  {:<owner_w$}  {:<8}  NAME",
                "ID",
                "OWNER",
                "STATUS",
                id_w = max_id,
                owner_w = max_owner,
            );
            for card in cards {
                println!(
                    "{:<id_w$}  {:<owner_w$}  {:<8}  {}",
                    card.get_card_id(),
                    text(card, CardField::Owner),
                    text(card, CardField::Status),
                    text(card, CardField::Name),
                    id_w = max_id,
                    owner_w = max_owner,
                );
            }
        }
        OutputFormat::Json => print_json(cards),
    }
}

/// Prints a single card in the specified format
pub fn print_card(card: &Card, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", card.get_card_id());
                return;
            }
            for field in CardField::ALL {
                println!("{:<17} {}", format!("{}:", field.header()), text(card, field));
            }
        }
        OutputFormat::Json => print_json(card),
    }
}

/// Prints a list of users in the specified format
pub fn print_users(users: &[User], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if users.is_empty() {
                if !config.quiet {
                    println!("No users found.");
                }
                return;
            }
            if config.quiet {
                for user in users {
                    println!("{}", user.get_username());
                }
                return;
            }
            let max_name = users
                .iter()
                .map(|u| u.get_username().len())
                .max()
                .unwrap_or(8)
                .max(8);
            println!("{:<width$}  {:<5}  PASSWORD", "USERNAME", "ROLE", width = max_name);
            for user in users {
                let password = if user.get_password_hash().is_some() { "yes" } else { "no" };
                println!(
                    "{:<width$}  {:<5}  {}",
                    user.get_username(),
                    user.get_role(),
                    password,
                    width = max_name
                );
            }
        }
        OutputFormat::Json => print_json(users),
    }
}

/// Prints a single user in the specified format
pub fn print_user(user: &User, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", user.get_username());
                return;
            }
            println!("Username: {}", user.get_username());
            println!("Role:     {}", user.get_role());
            println!("Created:  {}", user.get_created_at());
        }
        OutputFormat::Json => print_json(user),
    }
}

/// Prints the outcome of every pipeline step
pub fn print_report(report: &PipelineReport, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                let failed = report.failed_steps().len();
                println!("{}", failed);
                return;
            }
            println!("Pipeline {}", report.pipeline);
            for step in &report.steps {
                let status = match &step.outcome {
                    StepOutcome::Completed { filled } => format!("ok       {}", filled),
                    StepOutcome::Skipped { reason } => format!("skipped  {}", reason),
                    StepOutcome::Failed { error } => format!("FAILED   {}", error),
                };
                println!("  {:<16} {}", step.step.name(), status);
            }
        }
        OutputFormat::Json => print_json(report),
    }
}

/// Prints a success message in the specified format
pub fn print_success(message: &str, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if !config.quiet {
                println!("{}", message);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({"status": "ok", "message": message})),
    }
}
