use crate::db::DbPool;
use crate::models::{normalize_username, Role, User};
use crate::schema::users;
use anyhow::{anyhow, Context, Result};
use diesel::prelude::*;
use tracing::{debug, info, instrument};

/// Hashes a password with bcrypt at the default cost
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")
}

/// Creates a new user
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `username` - User name or e-mail; stored trimmed and lower-cased
/// * `password_hash` - A bcrypt hash, or `None` for Google-only accounts
/// * `role` - The user's role
///
/// ### Returns
///
/// A Result containing the newly created User if successful
///
/// ### Errors
///
/// Returns an error if:
/// - The user name is blank
/// - A user with the same name already exists
/// - The database insert operation fails
#[instrument(skip(pool, password_hash))]
pub fn create_user(pool: &DbPool, username: &str, password_hash: Option<String>, role: Role) -> Result<User> {
    let user = User::new(username, password_hash, role);
    if user.get_username().is_empty() {
        return Err(anyhow!("User name must not be empty"));
    }

    let conn = &mut pool.get()?;

    diesel::insert_into(users::table)
        .values(&user)
        .execute(conn)
        .map_err(|e| anyhow!("Failed to create user {}: {}", user.get_username(), e))?;

    info!("Created {} user {}", user.get_role(), user.get_username());
    Ok(user)
}

/// Inserts a user or replaces the stored one with the same name
pub fn upsert_user(pool: &DbPool, user: &User) -> Result<()> {
    let conn = &mut pool.get()?;

    diesel::replace_into(users::table)
        .values(user)
        .execute(conn)?;

    Ok(())
}

/// Retrieves a user by name (case-insensitive)
pub fn get_user(pool: &DbPool, username: &str) -> Result<Option<User>> {
    let conn = &mut pool.get()?;

    let user = users::table
        .find(normalize_username(username))
        .select(User::as_select())
        .first(conn)
        .optional()?;

    Ok(user)
}

/// Lists all users ordered by name
pub fn list_users(pool: &DbPool) -> Result<Vec<User>> {
    let conn = &mut pool.get()?;

    let result = users::table
        .order(users::username.asc())
        .select(User::as_select())
        .load(conn)?;

    Ok(result)
}

/// Changes a user's role
///
/// ### Errors
///
/// Returns an error if the user does not exist
#[instrument(skip(pool))]
pub fn set_user_role(pool: &DbPool, username: &str, role: Role) -> Result<User> {
    let username = normalize_username(username);
    let conn = &mut pool.get()?;

    let updated = diesel::update(users::table.find(&username))
        .set(users::role.eq(role))
        .execute(conn)?;

    if updated == 0 {
        return Err(anyhow!("User not found: {}", username));
    }

    let user = users::table
        .find(&username)
        .select(User::as_select())
        .first(conn)?;

    Ok(user)
}

/// Returns the user with this name, registering them as a `USER` when unknown
///
/// This is how a first Google sign-in becomes an account.
#[instrument(skip(pool))]
pub fn ensure_user(pool: &DbPool, username: &str) -> Result<User> {
    let candidate = User::new(username, None, Role::User);
    if candidate.get_username().is_empty() {
        return Err(anyhow!("User name must not be empty"));
    }

    let conn = &mut pool.get()?;

    let inserted = diesel::insert_or_ignore_into(users::table)
        .values(&candidate)
        .execute(conn)?;

    if inserted > 0 {
        info!("Registered new user {}", candidate.get_username());
    }

    let user = users::table
        .find(candidate.get_username())
        .select(User::as_select())
        .first(conn)?;

    Ok(user)
}

/// Checks a user name and password
///
/// ### Returns
///
/// The user when the password matches; `None` for an unknown user, a user
/// without a password or a wrong password
pub fn verify_credentials(pool: &DbPool, username: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = get_user(pool, username)? else {
        debug!("Login attempt for unknown user");
        return Ok(None);
    };

    let Some(hash) = user.get_password_hash() else {
        debug!("Login attempt for user without password");
        return Ok(None);
    };

    // A malformed stored hash is treated as a mismatch
    let matches = bcrypt::verify(password, &hash).unwrap_or(false);

    Ok(matches.then_some(user))
}
