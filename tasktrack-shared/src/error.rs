/// Error taxonomy for repository operations
///
/// Every repository call returns either a value or exactly one `RepoError`.
/// The variants are finer-grained than the four externally visible error
/// classes; [`RepoError::kind`] maps each variant onto its class.
///
/// | Class           | Variants                                   |
/// |-----------------|--------------------------------------------|
/// | `NotFound`      | `NotFound`                                 |
/// | `Io`            | `Io`, `Corrupt`, `NoChanges`, `Backend`    |
/// | `Authorization` | `Authorization`                            |
/// | `Validation`    | `Validation`                               |
///
/// # Example
///
/// ```
/// use tasktrack_shared::error::{ErrorKind, RepoError};
/// use tasktrack_shared::models::EntityKind;
///
/// let err = RepoError::NoChanges { entity: EntityKind::Task };
/// assert_eq!(err.kind(), ErrorKind::Io);
/// ```

use thiserror::Error;

use crate::codec::ParseError;
use crate::models::EntityKind;
use crate::store::StoreError;

/// Repository result type alias
pub type RepoResult<T> = Result<T, RepoError>;

/// Externally visible error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Record absent for get/update/delete
    NotFound,

    /// Underlying storage fault, corrupt required record, or rejected no-op update
    Io,

    /// Permission or uniqueness violation
    Authorization,

    /// Malformed input
    Validation,
}

/// Repository error
#[derive(Debug, Error)]
pub enum RepoError {
    /// No record with the given identity exists
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type that was looked up
        entity: EntityKind,
        /// Id (or description of the line) that was not found
        id: String,
    },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record required by the operation exists but cannot be decoded
    #[error("corrupt {entity} record: {source}")]
    Corrupt {
        /// Entity type of the corrupt record
        entity: EntityKind,
        /// Underlying codec failure
        #[source]
        source: ParseError,
    },

    /// Update called with snapshots that do not differ in any field
    #[error("no changes detected for {entity}")]
    NoChanges {
        /// Entity type being updated
        entity: EntityKind,
    },

    /// Backend-level failure that is not a plain I/O error
    #[error("backend error: {0}")]
    Backend(String),

    /// Permission or uniqueness violation
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Malformed input
    #[error("validation failed: {0}")]
    Validation(String),
}

impl RepoError {
    /// Builds a `NotFound` error for an entity id
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        RepoError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the externally visible class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::NotFound { .. } => ErrorKind::NotFound,
            RepoError::Io(_)
            | RepoError::Corrupt { .. }
            | RepoError::NoChanges { .. }
            | RepoError::Backend(_) => ErrorKind::Io,
            RepoError::Authorization(_) => ErrorKind::Authorization,
            RepoError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether this error means the record simply does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io { path, source } => RepoError::Io(std::io::Error::new(
                source.kind(),
                format!("{}: {}", path.display(), source),
            )),
            other @ StoreError::LineNotFound { .. } => RepoError::Backend(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for RepoError {
    fn from(err: validator::ValidationErrors) -> Self {
        RepoError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RepoError::not_found(EntityKind::User, "abc");
        assert_eq!(err.to_string(), "user not found: abc");

        let err = RepoError::NoChanges {
            entity: EntityKind::Project,
        };
        assert_eq!(err.to_string(), "no changes detected for project");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            RepoError::not_found(EntityKind::Task, "x").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RepoError::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::Io
        );
        assert_eq!(
            RepoError::Authorization("taken".into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            RepoError::Validation("empty".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(RepoError::Backend("gone".into()).kind(), ErrorKind::Io);
    }
}
