use anyhow::{anyhow, Result};
use clap::Subcommand;
use nakama::db::DbPool;
use nakama::models::normalize_username;
use nakama::repo;

use crate::output::{self, OutputConfig};

/// Card inspection commands
#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// List cards, optionally only those of one owner
    List {
        /// Only cards owned by this user (or SYSTEM)
        #[clap(long)]
        owner: Option<String>,
    },
    /// Show every column of one card
    Get {
        /// Card ID, e.g. Card_000001
        id: String,
    },
}

pub fn execute(pool: &DbPool, cmd: CardCommands, output_config: &OutputConfig) -> Result<()> {
    match cmd {
        CardCommands::List { owner } => {
            let cards = match owner {
                Some(owner) => repo::list_cards_by_owner(pool, &normalize_username(&owner))?,
                None => repo::list_cards(pool)?,
            };
            output::print_cards(&cards, output_config);
        }
        CardCommands::Get { id } => {
            let card = repo::get_card(pool, &id)?.ok_or_else(|| anyhow!("Card {} not found", id))?;
            output::print_card(&card, output_config);
        }
    }
    Ok(())
}
