/// Workflow state value object
///
/// The same shape serves two purposes: an entry in a project's state catalog,
/// and the current state embedded (by value) inside a task.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// A named workflow state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TaskState {
    /// State id
    pub id: Uuid,

    /// Display name (e.g. "Backlog")
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

impl TaskState {
    /// Creates a state with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        TaskState {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
