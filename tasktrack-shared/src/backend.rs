/// Backend wiring
///
/// Builds the full set of repositories for one storage backend and performs
/// the two-phase audit/task binding:
///
/// 1. build the audit log and the [`AuditTrail`]
/// 2. build the user, project and task repositories, each holding the trail
/// 3. bind the task repository into the trail for project roll-ups
///
/// # Example
///
/// ```
/// use tasktrack_shared::backend::Backend;
/// use tasktrack_shared::models::{Role, User};
/// use tasktrack_shared::session::Session;
///
/// # async fn example() -> tasktrack_shared::error::RepoResult<()> {
/// let backend = Backend::in_memory()?;
/// let admin = backend
///     .users
///     .create(&Session::system(), User::new("root", "pw", Role::Admin))
///     .await?;
/// assert_eq!(backend.audit.get_by_item_id(admin.id).await?.len(), 1);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use tracing::info;

use crate::audit::AuditTrail;
use crate::config::{BackendKind, FileLayout, StorageConfig};
use crate::error::RepoResult;
use crate::models::{Project, Task, User};
use crate::repository::{
    DocumentAuditLog, DocumentRepository, FlatFileAuditLog, FlatFileRepository, Repository,
    TaskLister,
};
use crate::session::{DocumentSessionStore, FlatFileSessionStore, SessionStore};
use crate::store::{DocumentStore, FlatFile};

/// Repositories of one storage backend
#[derive(Clone)]
pub struct Backend {
    pub users: Arc<dyn Repository<User>>,
    pub projects: Arc<dyn Repository<Project>>,
    pub tasks: Arc<dyn Repository<Task>>,
    pub audit: Arc<AuditTrail>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Backend {
    /// Flat-file backend using the files of `layout`
    pub fn flat_file(layout: &FileLayout) -> RepoResult<Self> {
        let audit = Arc::new(AuditTrail::new(Arc::new(FlatFileAuditLog::new(
            FlatFile::new(&layout.audits),
        ))));

        let tasks = Arc::new(FlatFileRepository::<Task>::new(
            FlatFile::new(&layout.tasks),
            audit.clone(),
        ));
        let lister: Arc<dyn TaskLister> = tasks.clone();
        audit.bind_tasks(Arc::downgrade(&lister))?;

        info!(users = %layout.users.display(), "Flat-file backend ready");

        Ok(Backend {
            users: Arc::new(FlatFileRepository::<User>::new(
                FlatFile::new(&layout.users),
                audit.clone(),
            )),
            projects: Arc::new(FlatFileRepository::<Project>::new(
                FlatFile::new(&layout.projects),
                audit.clone(),
            )),
            tasks,
            audit,
            sessions: Arc::new(FlatFileSessionStore::new(FlatFile::new(&layout.auth))),
        })
    }

    /// Document-store backend with fresh, empty collections
    pub fn in_memory() -> RepoResult<Self> {
        Self::documents(DocumentStore::new())
    }

    /// Document-store backend over an existing store
    pub fn documents(store: DocumentStore) -> RepoResult<Self> {
        let audit = Arc::new(AuditTrail::new(Arc::new(DocumentAuditLog::new(
            store.clone(),
        ))));

        let tasks = Arc::new(DocumentRepository::<Task>::new(store.clone(), audit.clone()));
        let lister: Arc<dyn TaskLister> = tasks.clone();
        audit.bind_tasks(Arc::downgrade(&lister))?;

        info!("Document backend ready");

        Ok(Backend {
            users: Arc::new(DocumentRepository::<User>::new(store.clone(), audit.clone())),
            projects: Arc::new(DocumentRepository::<Project>::new(
                store.clone(),
                audit.clone(),
            )),
            tasks,
            audit,
            sessions: Arc::new(DocumentSessionStore::new(store)),
        })
    }

    /// Backend selected by `config`
    pub fn from_config(config: &StorageConfig) -> RepoResult<Self> {
        match config.backend {
            BackendKind::FlatFile => Self::flat_file(&config.layout()),
            BackendKind::Memory => Self::in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_roll_up_is_bound() {
        let backend = Backend::in_memory().unwrap();
        assert!(backend
            .audit
            .get_project_audit_logs(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_from_config_memory() {
        let backend = Backend::from_config(&StorageConfig::memory()).unwrap();
        let admin = User::new("root", "pw", crate::models::Role::Admin);

        backend.sessions.save(&admin).await.unwrap();
        assert_eq!(backend.sessions.load().await.unwrap(), Some(admin));
        assert!(backend.users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_flat_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::from_config(&StorageConfig::flat_file(dir.path())).unwrap();

        backend
            .users
            .create(
                &Session::system(),
                User::new("root", "pw", crate::models::Role::Admin),
            )
            .await
            .unwrap();

        assert!(dir.path().join("users.csv").exists());
        assert!(dir.path().join("audits.csv").exists());
    }
}
