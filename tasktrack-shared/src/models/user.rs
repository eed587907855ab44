/// User model
///
/// Users are created by administrators. Usernames are unique across all users,
/// compared case-insensitively. The password is stored as given; hashing is the
/// caller's concern.
///
/// # Line format
///
/// ```text
/// userId,username,password,role
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::{Entity, EntityKind};
use crate::error::{RepoError, RepoResult};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Administrator: manages users and owns projects
    Admin,

    /// Team mate: works on assigned tasks
    Mate,
}

impl Role {
    /// Converts role to its stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Mate => "MATE",
        }
    }

    /// Parses role from its stored form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "MATE" => Some(Role::Mate),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name, unique ignoring case
    #[validate(length(min = 1, max = 64))]
    pub username: String,

    /// Stored password value
    #[validate(length(min = 1))]
    pub password: String,

    /// Role
    pub role: Role,
}

impl User {
    /// Creates a new user with a fresh id
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            password: password.into(),
            role,
        }
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
    const ADMIN_ONLY: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn item_name(&self) -> String {
        self.username.clone()
    }

    fn display_form(&self) -> String {
        format!("{} ({})", self.username, self.role)
    }

    fn check_unique(&self, others: &[Self]) -> RepoResult<()> {
        let wanted = self.username.to_lowercase();
        if others.iter().any(|u| u.username.to_lowercase() == wanted) {
            return Err(RepoError::Authorization(format!(
                "username '{}' is already taken",
                self.username
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse(Role::Admin.as_str()), Some(Role::Admin));
        assert_eq!(Role::parse(Role::Mate.as_str()), Some(Role::Mate));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_username_uniqueness_ignores_case() {
        let existing = vec![User::new("Alice", "pw", Role::Mate)];

        let dup = User::new("aLiCe", "other", Role::Admin);
        let err = dup.check_unique(&existing).unwrap_err();
        assert!(matches!(err, RepoError::Authorization(_)));
        assert!(err.to_string().contains("already taken"));

        let fresh = User::new("bob", "pw", Role::Mate);
        assert!(fresh.check_unique(&existing).is_ok());
    }

    #[test]
    fn test_empty_username_rejected() {
        let user = User::new("", "pw", Role::Mate);
        assert!(user.validate().is_err());
    }
}
