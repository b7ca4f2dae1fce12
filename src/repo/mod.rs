/// Repository module
///
/// This module provides the data access layer for the application.
/// It contains functions for reading and writing cards, users and
/// queued ownership claims.
///
/// The repository pattern abstracts away the details of database access
/// and provides a clean API for the rest of the application to use.

mod card_repo;
mod user_repo;
mod claim_repo;

// Re-export all repository functions
pub use card_repo::*;
pub use user_repo::*;
pub use claim_repo::*;
