//! Seed CSV files the descriptive columns are filled from.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::warn;

/// Values of the column named `header`, in file order, skipping blanks
///
/// A missing file yields no values.
pub fn column_values(path: &Path, header: &str) -> Result<Vec<String>> {
    if !path.exists() {
        warn!("Seed file {} not found", path.display());
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(header))
        .ok_or_else(|| anyhow!("{} has no {} column", path.display(), header))?;

    collect_column(&mut reader, index)
}

/// Values of the first column after the header row, skipping blanks
///
/// A missing file yields no values.
pub fn first_column_values(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        warn!("Seed file {} not found", path.display());
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    collect_column(&mut reader, 0)
}

fn collect_column(reader: &mut csv::Reader<std::fs::File>, index: usize) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_column_values_by_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("game_stats.csv");
        fs::write(&path, "MONSTER_POWER,POWER_COMBAT\n10,20\n,21\n30,\n").unwrap();

        assert_eq!(column_values(&path, "monster_power").unwrap(), vec!["10", "30"]);
        assert_eq!(column_values(&path, "POWER_COMBAT").unwrap(), vec!["20", "21"]);
        assert!(column_values(&path, "SPEED").is_err());
    }

    #[test]
    fn test_first_column_skips_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("descriptions.csv");
        fs::write(&path, "DESCRIPTION\n\"A card, forged in fire\"\nSecond\n").unwrap();

        assert_eq!(
            first_column_values(&path).unwrap(),
            vec!["A card, forged in fire", "Second"]
        );
    }

    #[test]
    fn test_missing_file_yields_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        assert!(column_values(&path, "MONSTER_POWER").unwrap().is_empty());
        assert!(first_column_values(&path).unwrap().is_empty());
    }
}
