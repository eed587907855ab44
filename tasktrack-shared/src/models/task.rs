/// Task model
///
/// A task belongs to a project and is assigned to a user. Its current state is
/// a copy of one of the project's catalog entries taken at assignment time, so
/// later catalog edits do not rewrite existing tasks. `role` is a snapshot of
/// the assignee's role at the same moment.
///
/// # Line format
///
/// ```text
/// taskId,title,description,createdAt,creatorId,projectId,assignedId,stateId,stateName,role
/// ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{now, Entity, EntityKind, Role, TaskState};

/// Task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Short title
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    /// Free-form description
    pub description: String,

    /// When the task was created (local time)
    pub created_at: NaiveDateTime,

    /// User who created the task
    pub creator_id: Uuid,

    /// Project this task belongs to
    pub project_id: Uuid,

    /// Assignee
    pub assigned_id: Uuid,

    /// Current state (embedded value, not a reference)
    #[validate(nested)]
    pub state: TaskState,

    /// Assignee role at assignment time
    pub role: Role,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub creator_id: Uuid,
    pub project_id: Uuid,
    pub assigned_id: Uuid,
    pub state: TaskState,
    pub role: Role,
}

impl Task {
    /// Creates a new task stamped with the current time
    pub fn new(data: CreateTask) -> Self {
        Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            created_at: now(),
            creator_id: data.creator_id,
            project_id: data.project_id,
            assigned_id: data.assigned_id,
            state: data.state,
            role: data.role,
        }
    }

    /// Returns a copy of this task moved to `state`
    pub fn with_state(&self, state: TaskState) -> Self {
        Task {
            state,
            ..self.clone()
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> Uuid {
        self.id
    }

    fn item_name(&self) -> String {
        self.title.clone()
    }

    fn display_form(&self) -> String {
        format!("{} [{}]", self.title, self.state.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task::new(CreateTask {
            title: "Write docs".to_string(),
            description: "README".to_string(),
            creator_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            assigned_id: Uuid::new_v4(),
            state: TaskState::new("Backlog"),
            role: Role::Mate,
        })
    }

    #[test]
    fn test_with_state_keeps_identity() {
        let task = sample();
        let moved = task.with_state(TaskState::new("Done"));

        assert_eq!(moved.id, task.id);
        assert_eq!(moved.state.name, "Done");
        assert_eq!(task.state.name, "Backlog");
    }

    #[test]
    fn test_display_form() {
        assert_eq!(sample().display_form(), "Write docs [Backlog]");
    }

    #[test]
    fn test_validation() {
        let mut task = sample();
        assert!(task.validate().is_ok());

        task.title.clear();
        assert!(task.validate().is_err());
    }
}
