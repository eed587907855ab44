/// Project model
///
/// A project owns an ordered catalog of task states. The catalog is never
/// absent: an empty list is a valid value and is stored as `[]`.
///
/// # Line format
///
/// ```text
/// projectId,name,description,createdAt,adminId,[stateId,name;stateId,name]
/// ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{now, Entity, EntityKind, TaskState};

/// Project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Project {
    /// Unique project ID (UUID v4)
    pub id: Uuid,

    /// Project name
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    /// Free-form description
    pub description: String,

    /// When the project was created (local time)
    pub created_at: NaiveDateTime,

    /// Owning administrator
    pub admin_id: Uuid,

    /// Available workflow states, in display order
    #[validate(nested)]
    pub task_states: Vec<TaskState>,
}

impl Project {
    /// Creates a new project stamped with the current time
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        admin_id: Uuid,
        task_states: Vec<TaskState>,
    ) -> Self {
        Project {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            created_at: now(),
            admin_id,
            task_states,
        }
    }
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> Uuid {
        self.id
    }

    fn item_name(&self) -> String {
        self.name.clone()
    }

    fn display_form(&self) -> String {
        format!("{} - {}", self.name, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_form() {
        let project = Project::new("Website", "relaunch", Uuid::new_v4(), vec![]);
        assert_eq!(project.display_form(), "Website - relaunch");
        assert_eq!(project.item_name(), "Website");
    }
}
