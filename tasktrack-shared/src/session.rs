/// Session context and the persisted login snapshot
///
/// There is no global "current user". Every mutating repository call takes an
/// explicit [`Session`] naming the acting user; it supplies the audit actor and
/// drives admin-only checks.
///
/// The logged-in user can additionally be persisted as a snapshot (`auth.csv`
/// for the flat-file backend) through a [`SessionStore`], so a later process
/// can restore the session.
///
/// # Example
///
/// ```
/// use tasktrack_shared::models::{Role, User};
/// use tasktrack_shared::session::Session;
///
/// let admin = User::new("root", "pw", Role::Admin);
/// let session = Session::from_user(&admin);
/// assert!(session.require_admin().is_ok());
/// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::codec::LineCodec;
use crate::error::{RepoError, RepoResult};
use crate::models::{EntityKind, Role, User};
use crate::store::{DocumentStore, FlatFile};

/// Collection holding the session snapshot in the document store
const AUTH_COLLECTION: &str = "auth";

/// Acting user for a repository call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Session {
            user_id,
            username: username.into(),
            role,
        }
    }

    /// Session acting as `user`
    pub fn from_user(user: &User) -> Self {
        Session::new(user.id, user.username.clone(), user.role)
    }

    /// Built-in administrator used to seed the first real admin account
    pub fn system() -> Self {
        Session::new(Uuid::nil(), "system", Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Authorization` unless the session belongs to an admin
    pub fn require_admin(&self) -> RepoResult<()> {
        if !self.is_admin() {
            return Err(RepoError::Authorization(format!(
                "user '{}' is not an administrator",
                self.username
            )));
        }
        Ok(())
    }
}

/// Persistence of the logged-in user snapshot
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `user` as the current session, replacing any previous one
    async fn save(&self, user: &User) -> RepoResult<()>;

    /// Loads the stored user, if any
    async fn load(&self) -> RepoResult<Option<User>>;

    /// Forgets the stored session
    async fn clear(&self) -> RepoResult<()>;

    /// Loads the stored session as a [`Session`] value
    async fn current(&self) -> RepoResult<Option<Session>> {
        Ok(self.load().await?.as_ref().map(Session::from_user))
    }
}

/// Session snapshot kept as a single user line in `auth.csv`
pub struct FlatFileSessionStore {
    file: FlatFile,
}

impl FlatFileSessionStore {
    pub fn new(file: FlatFile) -> Self {
        FlatFileSessionStore { file }
    }
}

#[async_trait]
impl SessionStore for FlatFileSessionStore {
    async fn save(&self, user: &User) -> RepoResult<()> {
        self.file.clear().await?;
        self.file.append(&user.to_line()).await?;
        tracing::info!(user_id = %user.id, "Session saved");
        Ok(())
    }

    async fn load(&self) -> RepoResult<Option<User>> {
        let lines = self.file.read_all().await?;
        let Some(line) = lines.first() else {
            return Ok(None);
        };

        User::from_line(line)
            .map(Some)
            .map_err(|source| RepoError::Corrupt {
                entity: EntityKind::User,
                source,
            })
    }

    async fn clear(&self) -> RepoResult<()> {
        self.file.clear().await?;
        tracing::info!("Session cleared");
        Ok(())
    }
}

/// Session snapshot kept in the document store's `auth` collection
pub struct DocumentSessionStore {
    store: DocumentStore,
}

impl DocumentSessionStore {
    pub fn new(store: DocumentStore) -> Self {
        DocumentSessionStore { store }
    }
}

#[async_trait]
impl SessionStore for DocumentSessionStore {
    async fn save(&self, user: &User) -> RepoResult<()> {
        let doc = serde_json::to_value(user).map_err(|e| RepoError::Backend(e.to_string()))?;
        self.store.clear(AUTH_COLLECTION).await;
        self.store.insert_one(AUTH_COLLECTION, doc).await;
        Ok(())
    }

    async fn load(&self) -> RepoResult<Option<User>> {
        let docs: Vec<Value> = self.store.find_all(AUTH_COLLECTION).await;
        match docs.into_iter().next() {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| RepoError::Backend(e.to_string())),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> RepoResult<()> {
        self.store.clear(AUTH_COLLECTION).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_require_admin() {
        let mate = User::new("bob", "pw", Role::Mate);
        let err = Session::from_user(&mate).require_admin().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        assert!(Session::system().require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_flat_file_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileSessionStore::new(FlatFile::new(dir.path().join("auth.csv")));
        assert_eq!(store.load().await.unwrap(), None);

        let first = User::new("alice", "pw", Role::Admin);
        let second = User::new("bob", "pw", Role::Mate);
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(second.clone()));
        assert_eq!(
            store.current().await.unwrap(),
            Some(Session::from_user(&second))
        );

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flat_file_corrupt_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = FlatFile::new(dir.path().join("auth.csv"));
        file.append("not,a,user").await.unwrap();

        let err = FlatFileSessionStore::new(file).load().await.unwrap_err();
        assert!(matches!(err, RepoError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_document_session_round_trip() {
        let store = DocumentSessionStore::new(DocumentStore::new());
        let user = User::new("alice", "pw", Role::Admin);

        store.save(&user).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(user));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}
