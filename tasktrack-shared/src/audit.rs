/// Audit trail: recording and querying audit entries
///
/// The trail writes through an [`AuditLogRepository`] and answers history
/// queries, newest first. The project roll-up (a project's own entries plus
/// the entries of all its tasks) needs read access to the task repository,
/// while the task repository needs the trail to record its own changes. The
/// cycle is broken with two-phase wiring: the trail is built first, handed to
/// every repository, and the task side is bound afterwards with
/// [`AuditTrail::bind_tasks`]. The trail only holds a weak reference, so it
/// never keeps the task repository alive.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasktrack_shared::audit::AuditTrail;
/// use tasktrack_shared::models::Task;
/// use tasktrack_shared::repository::{DocumentAuditLog, DocumentRepository, TaskLister};
/// use tasktrack_shared::store::DocumentStore;
///
/// let store = DocumentStore::new();
/// let audit = Arc::new(AuditTrail::new(Arc::new(DocumentAuditLog::new(store.clone()))));
/// let tasks = Arc::new(DocumentRepository::<Task>::new(store, audit.clone()));
///
/// let lister: Arc<dyn TaskLister> = tasks.clone();
/// audit.bind_tasks(Arc::downgrade(&lister)).unwrap();
/// ```

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{RepoError, RepoResult};
use crate::models::AuditLog;
use crate::repository::{AuditLogRepository, TaskLister};

/// Shared audit recorder and history reader
pub struct AuditTrail {
    log: Arc<dyn AuditLogRepository>,
    tasks: OnceLock<Weak<dyn TaskLister>>,
}

impl AuditTrail {
    pub fn new(log: Arc<dyn AuditLogRepository>) -> Self {
        AuditTrail {
            log,
            tasks: OnceLock::new(),
        }
    }

    /// Binds the task source used by [`get_project_audit_logs`](Self::get_project_audit_logs)
    ///
    /// # Errors
    ///
    /// `Backend` if a task source is already bound
    pub fn bind_tasks(&self, tasks: Weak<dyn TaskLister>) -> RepoResult<()> {
        self.tasks
            .set(tasks)
            .map_err(|_| RepoError::Backend("audit trail task source already bound".into()))
    }

    /// Appends one audit entry
    pub async fn record_change(&self, entry: AuditLog) -> RepoResult<AuditLog> {
        let entry = self.log.create(entry).await?;
        info!(
            item_id = %entry.item_id,
            action = %entry.action_type,
            actor = %entry.user_name,
            "Audit entry recorded"
        );
        Ok(entry)
    }

    /// Every readable entry, newest first
    pub async fn list(&self) -> RepoResult<Vec<AuditLog>> {
        let mut entries = self.log.list().await?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Entries for one item, newest first
    pub async fn get_by_item_id(&self, item_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        let mut entries = self.log.list_by_item(item_id).await?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Entries for a project and every task currently in it, newest first
    ///
    /// Tasks are matched by their current `project_id`; history of tasks that
    /// were deleted is not included.
    ///
    /// # Errors
    ///
    /// - `Backend` if no task source is bound or it has been dropped
    /// - any error from reading the tasks or the audit log
    pub async fn get_project_audit_logs(&self, project_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        let tasks = self.task_source()?.list_tasks().await?;

        let mut items: HashSet<Uuid> = tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id)
            .collect();
        items.insert(project_id);

        let mut entries: Vec<AuditLog> = self
            .log
            .list()
            .await?
            .into_iter()
            .filter(|entry| items.contains(&entry.item_id))
            .collect();
        sort_newest_first(&mut entries);

        debug!(
            project_id = %project_id,
            items = items.len(),
            entries = entries.len(),
            "Project audit roll-up"
        );
        Ok(entries)
    }

    fn task_source(&self) -> RepoResult<Arc<dyn TaskLister>> {
        self.tasks
            .get()
            .ok_or_else(|| RepoError::Backend("audit trail has no task source".into()))?
            .upgrade()
            .ok_or_else(|| RepoError::Backend("task source was dropped".into()))
    }
}

/// Stable sort: entries with equal timestamps keep their storage order
fn sort_newest_first(entries: &mut [AuditLog]) {
    entries.sort_by(|a, b| b.audit_time.cmp(&a.audit_time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, CreateTask, Role, Task, TaskState};
    use crate::repository::{DocumentAuditLog, DocumentRepository, Repository};
    use crate::session::Session;
    use crate::store::DocumentStore;
    use chrono::NaiveDate;

    fn at(minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn trail() -> (DocumentStore, Arc<AuditTrail>) {
        let store = DocumentStore::new();
        let trail = Arc::new(AuditTrail::new(Arc::new(DocumentAuditLog::new(
            store.clone(),
        ))));
        (store, trail)
    }

    #[tokio::test]
    async fn test_item_history_newest_first() {
        let (_, trail) = trail();
        let session = Session::system();
        let item = Uuid::new_v4();

        for minute in [1, 3, 2] {
            trail
                .record_change(AuditLog::new(item, "x", &session, ActionType::Update).at(at(minute)))
                .await
                .unwrap();
        }
        trail
            .record_change(AuditLog::new(Uuid::new_v4(), "y", &session, ActionType::Create))
            .await
            .unwrap();

        let times: Vec<_> = trail
            .get_by_item_id(item)
            .await
            .unwrap()
            .iter()
            .map(|e| e.audit_time)
            .collect();
        assert_eq!(times, vec![at(3), at(2), at(1)]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_storage_order() {
        let (_, trail) = trail();
        let session = Session::system();
        let item = Uuid::new_v4();

        for name in ["first", "second"] {
            trail
                .record_change(AuditLog::new(item, name, &session, ActionType::Update).at(at(5)))
                .await
                .unwrap();
        }

        let names: Vec<_> = trail
            .get_by_item_id(item)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.item_name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_roll_up_requires_bound_tasks() {
        let (_, trail) = trail();
        let err = trail.get_project_audit_logs(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepoError::Backend(_)));
    }

    #[tokio::test]
    async fn test_roll_up_after_tasks_dropped() {
        let (store, trail) = trail();
        let tasks: Arc<dyn TaskLister> =
            Arc::new(DocumentRepository::<Task>::new(store, trail.clone()));
        trail.bind_tasks(Arc::downgrade(&tasks)).unwrap();
        drop(tasks);

        let err = trail.get_project_audit_logs(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepoError::Backend(_)));
    }

    #[tokio::test]
    async fn test_roll_up_includes_project_tasks_only() {
        let (store, trail) = trail();
        let tasks = Arc::new(DocumentRepository::<Task>::new(store, trail.clone()));
        let lister: Arc<dyn TaskLister> = tasks.clone();
        trail.bind_tasks(Arc::downgrade(&lister)).unwrap();

        let session = Session::system();
        let project_id = Uuid::new_v4();
        let new_task = |project_id| {
            Task::new(CreateTask {
                title: "t".to_string(),
                description: String::new(),
                creator_id: Uuid::new_v4(),
                project_id,
                assigned_id: Uuid::new_v4(),
                state: TaskState::new("Backlog"),
                role: Role::Mate,
            })
        };

        let mine = tasks.create(&session, new_task(project_id)).await.unwrap();
        let other = tasks.create(&session, new_task(Uuid::new_v4())).await.unwrap();
        trail
            .record_change(AuditLog::new(project_id, "P", &session, ActionType::Create))
            .await
            .unwrap();

        let items: HashSet<Uuid> = trail
            .get_project_audit_logs(project_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.item_id)
            .collect();
        assert!(items.contains(&mine.id));
        assert!(items.contains(&project_id));
        assert!(!items.contains(&other.id));
    }

    #[test]
    fn test_bind_twice_fails() {
        let (store, trail) = trail();
        let tasks: Arc<dyn TaskLister> =
            Arc::new(DocumentRepository::<Task>::new(store, trail.clone()));

        trail.bind_tasks(Arc::downgrade(&tasks)).unwrap();
        assert!(trail.bind_tasks(Arc::downgrade(&tasks)).is_err());
    }
}
