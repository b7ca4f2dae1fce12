use anyhow::{bail, Result};
use clap::Subcommand;
use nakama::db::DbPool;
use nakama::models::Role;
use nakama::repo;

use crate::output::{self, OutputConfig};

/// User management commands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Add a user
    Add {
        /// Username or email address
        username: String,
        /// Password for the login form; omit for Google-only accounts
        #[clap(long)]
        password: Option<String>,
        /// ADMIN or USER
        #[clap(long, default_value = "USER")]
        role: Role,
    },
    /// List all users
    List,
    /// Change a user's role
    Role {
        username: String,
        /// ADMIN or USER
        role: Role,
    },
}

pub fn execute(pool: &DbPool, cmd: UserCommands, output_config: &OutputConfig) -> Result<()> {
    match cmd {
        UserCommands::Add { username, password, role } => {
            if repo::get_user(pool, &username)?.is_some() {
                bail!("User {} already exists", username);
            }
            let hash = password.as_deref().map(repo::hash_password).transpose()?;
            let user = repo::create_user(pool, &username, hash, role)?;
            output::print_user(&user, output_config);
        }
        UserCommands::List => {
            let users = repo::list_users(pool)?;
            output::print_users(&users, output_config);
        }
        UserCommands::Role { username, role } => {
            let user = repo::set_user_role(pool, &username, role)?;
            output::print_success(
                &format!("{} is now {}", user.get_username(), user.get_role()),
                output_config,
            );
        }
    }
    Ok(())
}
