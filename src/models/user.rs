use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::Role;

/// Normalises a user name or e-mail the way it is stored
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// A person who can sign in
///
/// Google users are keyed by their e-mail address and have no password.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    username: String,

    #[serde(skip_serializing, default)]
    password_hash: Option<String>,

    role: Role,

    created_at: NaiveDateTime,
}

impl User {
    /// Creates a new user
    ///
    /// ### Arguments
    ///
    /// * `username` - The user name or e-mail; it is trimmed and lower-cased
    /// * `password_hash` - A bcrypt hash, or `None` for Google-only accounts
    /// * `role` - The user's role
    ///
    /// ### Returns
    ///
    /// A new `User` created now
    pub fn new(username: &str, password_hash: Option<String>, role: Role) -> Self {
        Self {
            username: normalize_username(username),
            password_hash,
            role,
            created_at: Utc::now().naive_utc(),
        }
    }

    /// Gets the user name
    pub fn get_username(&self) -> String {
        self.username.clone()
    }

    /// Gets the stored password hash, if any
    pub fn get_password_hash(&self) -> Option<String> {
        self.password_hash.clone()
    }

    /// Gets the user's role
    pub fn get_role(&self) -> Role {
        self.role
    }

    /// Gets the creation timestamp
    pub fn get_created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalises_name() {
        let user = User::new("  Alice@Example.COM ", None, Role::User);
        assert_eq!(user.get_username(), "alice@example.com");
        assert!(!user.is_admin());
        assert!(user.get_password_hash().is_none());
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User::new("admin", Some("$2b$04$hash".to_string()), Role::Admin);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "admin");
        assert_eq!(json["role"], "ADMIN");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" USER ".parse::<Role>().unwrap(), Role::User);
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "ADMIN");
    }
}
