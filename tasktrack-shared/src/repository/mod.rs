/// Entity repositories
///
/// Two backends implement the same contracts:
///
/// - [`flat_file`]: one delimited text file per entity; a record's serialized
///   line is its identity for update and delete
/// - [`document`]: in-process JSON document collections
///
/// Callers hold repositories as `Arc<dyn Repository<T>>` and do not know which
/// backend is wired in. Every create/update/delete of a user, project or task
/// writes exactly one audit entry through the shared [`AuditTrail`].
///
/// # Mutation flow
///
/// ```text
/// update(new, old)
///   ├─> authorize + validate + diff (empty diff -> NoChanges)
///   ├─> replace(old snapshot, new snapshot)   (stale snapshot -> NotFound)
///   └─> audit trail: one UPDATE entry
/// ```
///
/// An audit failure is returned to the caller even though the primary
/// mutation has already been written.
///
/// [`AuditTrail`]: crate::audit::AuditTrail

pub mod document;
pub mod flat_file;

pub use document::{DocumentAuditLog, DocumentRepository};
pub use flat_file::{FlatFileAuditLog, FlatFileRepository};

use async_trait::async_trait;
use uuid::Uuid;

use crate::diff::{diff, ChangeSummary};
use crate::error::{RepoError, RepoResult};
use crate::models::{ActionType, AuditLog, Entity, Project, Task, User};
use crate::session::Session;

/// CRUD contract shared by the user, project and task repositories
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Persists a new entity and audits the creation
    ///
    /// # Errors
    ///
    /// - `Authorization` for admin-only entities without an admin session, or
    ///   a uniqueness violation (duplicate username)
    /// - `Validation` for invalid fields or an id that already exists
    /// - `Io` if the store or the audit write fails
    async fn create(&self, session: &Session, entity: T) -> RepoResult<T>;

    /// Replaces the `old` snapshot with `new` and audits the changed fields
    ///
    /// `label`, when given, is recorded as the audit entry's changed field in
    /// place of the joined field names.
    ///
    /// # Errors
    ///
    /// - `NoChanges` if no field differs
    /// - `NotFound` if `old` no longer matches the stored record
    async fn update(&self, session: &Session, new: T, old: &T, label: Option<&str>)
        -> RepoResult<T>;

    /// Removes the entity with `id` and audits its prior display form
    async fn delete(&self, session: &Session, id: Uuid) -> RepoResult<T>;

    /// Returns the entity with `id`
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `Corrupt` if its record cannot be decoded
    async fn get_by_id(&self, id: Uuid) -> RepoResult<T>;

    /// Returns every readable entity in storage order, skipping corrupt records
    async fn list(&self) -> RepoResult<Vec<T>>;
}

/// Append-only storage of audit entries
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Appends one entry
    async fn create(&self, entry: AuditLog) -> RepoResult<AuditLog>;

    /// Returns every readable entry in storage order, skipping corrupt records
    async fn list(&self) -> RepoResult<Vec<AuditLog>>;

    /// Returns entries describing `item_id`, in storage order
    async fn list_by_item(&self, item_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|entry| entry.item_id == item_id)
            .collect())
    }
}

/// Read-only access to all tasks, as needed by the project audit roll-up
#[async_trait]
pub trait TaskLister: Send + Sync {
    async fn list_tasks(&self) -> RepoResult<Vec<Task>>;
}

#[async_trait]
impl<R: Repository<Task> + ?Sized> TaskLister for R {
    async fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        self.list().await
    }
}

/// User lookups on top of any user repository
#[async_trait]
pub trait UserQueries {
    /// Finds a user by name, ignoring case
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
}

#[async_trait]
impl<R: Repository<User> + ?Sized> UserQueries for R {
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let wanted = username.to_lowercase();
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|u| u.username.to_lowercase() == wanted))
    }
}

/// Project lookups on top of any project repository
#[async_trait]
pub trait ProjectQueries {
    /// Projects owned by `admin_id`
    async fn list_by_admin(&self, admin_id: Uuid) -> RepoResult<Vec<Project>>;
}

#[async_trait]
impl<R: Repository<Project> + ?Sized> ProjectQueries for R {
    async fn list_by_admin(&self, admin_id: Uuid) -> RepoResult<Vec<Project>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.admin_id == admin_id)
            .collect())
    }
}

/// Task lookups on top of any task repository
#[async_trait]
pub trait TaskQueries {
    /// Tasks belonging to `project_id`
    async fn list_by_project(&self, project_id: Uuid) -> RepoResult<Vec<Task>>;

    /// Tasks assigned to `user_id`
    async fn list_by_assignee(&self, user_id: Uuid) -> RepoResult<Vec<Task>>;
}

#[async_trait]
impl<R: Repository<Task> + ?Sized> TaskQueries for R {
    async fn list_by_project(&self, project_id: Uuid) -> RepoResult<Vec<Task>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|t| t.project_id == project_id)
            .collect())
    }

    async fn list_by_assignee(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|t| t.assigned_id == user_id)
            .collect())
    }
}

/// Checks every precondition of `create` against the current records
pub(crate) fn check_create<T: Entity>(
    session: &Session,
    entity: &T,
    existing: &[T],
) -> RepoResult<()> {
    if T::ADMIN_ONLY {
        session.require_admin()?;
    }
    entity.validate()?;

    // Ids are unique across live records
    if existing.iter().any(|e| e.id() == entity.id()) {
        return Err(RepoError::Validation(format!(
            "{} {} already exists",
            T::KIND,
            entity.id()
        )));
    }
    entity.check_unique(existing)
}

/// Checks the session, identity and field rules of `update` and computes the diff
pub(crate) fn check_update<T: Entity>(session: &Session, new: &T, old: &T) -> RepoResult<ChangeSummary> {
    if T::ADMIN_ONLY {
        session.require_admin()?;
    }
    if new.id() != old.id() {
        return Err(RepoError::Validation(format!(
            "cannot update {} {} from a snapshot of {}",
            T::KIND,
            new.id(),
            old.id()
        )));
    }
    new.validate()?;

    ChangeSummary::from_changes(&diff(old, new)).ok_or(RepoError::NoChanges { entity: T::KIND })
}

/// Uniqueness check for `update`: `new` against every other record
pub(crate) fn check_unique_among<T: Entity>(new: &T, existing: Vec<T>) -> RepoResult<()> {
    let others: Vec<T> = existing.into_iter().filter(|e| e.id() != new.id()).collect();
    new.check_unique(&others)
}

pub(crate) fn created_entry<T: Entity>(session: &Session, entity: &T) -> AuditLog {
    AuditLog::new(entity.id(), entity.item_name(), session, ActionType::Create)
        .with_new_value(entity.display_form())
}

pub(crate) fn updated_entry<T: Entity>(
    session: &Session,
    entity: &T,
    summary: ChangeSummary,
    label: Option<&str>,
) -> AuditLog {
    AuditLog::new(entity.id(), entity.item_name(), session, ActionType::Update)
        .with_changes(summary.labeled(label))
}

pub(crate) fn deleted_entry<T: Entity>(session: &Session, entity: &T) -> AuditLog {
    AuditLog::new(entity.id(), entity.item_name(), session, ActionType::Delete)
        .with_old_value(entity.display_form())
}
