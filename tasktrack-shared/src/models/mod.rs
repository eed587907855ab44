/// Domain models for TaskTrack
///
/// This module contains the persisted entities and the [`Entity`] contract
/// shared by every record that goes through a generic repository.
///
/// # Models
///
/// - `user`: User accounts and roles
/// - `project`: Projects and their catalog of task states
/// - `task`: Tasks with an embedded current state
/// - `task_state`: Workflow state value object
/// - `audit_log`: Append-only audit entries
///
/// # Example
///
/// ```
/// use tasktrack_shared::models::{Project, TaskState};
/// use uuid::Uuid;
///
/// let project = Project::new(
///     "Website",
///     "Marketing site relaunch",
///     Uuid::new_v4(),
///     vec![TaskState::new("Backlog"), TaskState::new("In Progress")],
/// );
/// assert_eq!(project.task_states.len(), 2);
/// ```

pub mod audit_log;
pub mod project;
pub mod task;
pub mod task_state;
pub mod user;

pub use audit_log::{ActionType, AuditLog};
pub use project::Project;
pub use task::{CreateTask, Task};
pub use task_state::TaskState;
pub use user::{Role, User};

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::codec::LineCodec;
use crate::diff::Diffable;
use crate::error::RepoResult;

/// Persisted entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Project,
    Task,
    AuditLog,
}

impl EntityKind {
    /// Lowercase name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Project => "project",
            EntityKind::Task => "task",
            EntityKind::AuditLog => "audit log",
        }
    }

    /// Collection name in the document store
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Project => "projects",
            EntityKind::Task => "tasks",
            EntityKind::AuditLog => "audits",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract for records managed by a generic entity repository
///
/// Every mutation of an `Entity` is audited. The repository relies on:
/// - the codec (`LineCodec`) for the flat-file line identity,
/// - the diff engine (`Diffable`) for update summaries,
/// - `validator` rules for field-level input checks.
pub trait Entity:
    LineCodec
    + Diffable
    + Validate
    + Clone
    + PartialEq
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Entity type tag
    const KIND: EntityKind;

    /// Whether create/update/delete require an admin session
    const ADMIN_ONLY: bool = false;

    /// Record id
    fn id(&self) -> Uuid;

    /// Denormalized name stored in audit entries
    fn item_name(&self) -> String;

    /// Human-readable form recorded as audit old/new value
    fn display_form(&self) -> String;

    /// Checks uniqueness rules against the other live records
    ///
    /// `others` never contains a record with this entity's id.
    fn check_unique(&self, _others: &[Self]) -> RepoResult<()> {
        Ok(())
    }
}

/// Current local time without offset, as stored in every timestamp field
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_names() {
        assert_eq!(EntityKind::User.as_str(), "user");
        assert_eq!(EntityKind::AuditLog.to_string(), "audit log");
        assert_eq!(EntityKind::Task.collection(), "tasks");
        assert_eq!(EntityKind::AuditLog.collection(), "audits");
    }
}
