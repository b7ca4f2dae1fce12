use crate::db::DbPool;
use crate::models::OwnershipClaim;
use crate::schema::ownership_claims;
use anyhow::{anyhow, Result};
use diesel::prelude::*;
use tracing::{info, instrument};

/// Queues a claim from `email` for the card at `card_url`
#[instrument(skip(pool))]
pub fn create_claim(pool: &DbPool, email: &str, card_url: &str) -> Result<OwnershipClaim> {
    let claim = OwnershipClaim::new(email, card_url);
    if claim.get_email().is_empty() || claim.get_card_url().is_empty() {
        return Err(anyhow!("A claim needs both an e-mail and a card URL"));
    }

    let conn = &mut pool.get()?;

    diesel::insert_into(ownership_claims::table)
        .values(&claim)
        .execute(conn)?;

    info!("Queued ownership claim {}", claim.get_id());
    Ok(claim)
}

/// Lists queued claims, oldest first
pub fn list_claims(pool: &DbPool) -> Result<Vec<OwnershipClaim>> {
    let conn = &mut pool.get()?;

    let claims = ownership_claims::table
        .order((ownership_claims::created_at.asc(), ownership_claims::id.asc()))
        .select(OwnershipClaim::as_select())
        .load(conn)?;

    Ok(claims)
}

/// Removes a claim from the queue
///
/// ### Returns
///
/// `true` when a claim was deleted
pub fn delete_claim(pool: &DbPool, claim_id: &str) -> Result<bool> {
    let conn = &mut pool.get()?;

    let deleted = diesel::delete(ownership_claims::table.find(claim_id)).execute(conn)?;

    Ok(deleted > 0)
}

#[cfg(test)]
mod tests;
