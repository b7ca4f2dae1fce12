use anyhow::{bail, Result};
use nakama::db::DbPool;
use nakama::import;
use std::path::{Path, PathBuf};

use crate::output::{self, OutputConfig};

/// Imports cards and/or users from CSV files
pub fn import(
    pool: &DbPool,
    cards: Option<PathBuf>,
    users: Option<PathBuf>,
    admins: Option<PathBuf>,
    output_config: &OutputConfig,
) -> Result<()> {
    if cards.is_none() && users.is_none() {
        bail!("Nothing to import: pass --cards and/or --users");
    }
    if admins.is_some() && users.is_none() {
        bail!("--admins only applies together with --users");
    }

    if let Some(path) = cards {
        let count = import::import_cards(pool, &path)?;
        output::print_success(&format!("Imported {} cards from {}", count, path.display()), output_config);
    }
    if let Some(path) = users {
        let count = import::import_users(pool, &path, admins.as_deref())?;
        output::print_success(&format!("Imported {} users from {}", count, path.display()), output_config);
    }
    Ok(())
}

/// Writes the card table to a CSV file
pub fn export(pool: &DbPool, path: &Path, output_config: &OutputConfig) -> Result<()> {
    let count = import::export_cards(pool, path)?;
    output::print_success(&format!("Exported {} cards to {}", count, path.display()), output_config);
    Ok(())
}
