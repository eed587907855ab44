/// Field-level diff between two snapshots of the same entity
///
/// Each entity lists its comparable fields in a fixed order (the codec's
/// field order). A field is reported when its encoded form differs. Collection
/// fields are compared as a whole: any change inside a project's state list is
/// one `taskStates` change.
///
/// # Example
///
/// ```
/// use tasktrack_shared::diff::diff;
/// use tasktrack_shared::models::{Project, TaskState};
/// use uuid::Uuid;
///
/// let before = Project::new("P1", "demo", Uuid::new_v4(), vec![TaskState::new("Backlog")]);
/// let after = tasktrack_shared::models::Project { task_states: vec![], ..before.clone() };
///
/// let changes = diff(&before, &after);
/// assert_eq!(changes.len(), 1);
/// assert_eq!(changes[0].field, "taskStates");
/// assert_eq!(changes[0].new_value, "[]");
/// ```

use crate::codec::{encode_state, encode_states, format_time};
use crate::models::{Project, Task, User};

/// Separator used when several changes are folded into one audit entry
///
/// Old and new values escape it (and `\\`) with a backslash, so a joined
/// value can be taken apart again with [`split_aggregate`].
pub const AGGREGATE_SEPARATOR: char = '|';

/// Value recorded in place of sensitive field contents
pub const REDACTED: &str = "***";

/// One changed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old_value: String,
    pub new_value: String,
}

/// Entities that can be compared field by field
pub trait Diffable {
    /// Ordered `(field name, encoded value)` pairs
    fn diff_fields(&self) -> Vec<(&'static str, String)>;

    /// Fields whose values must not be copied into audit entries
    fn is_sensitive(_field: &str) -> bool {
        false
    }
}

/// Computes the ordered list of changed fields from `old` to `new`
pub fn diff<T: Diffable>(old: &T, new: &T) -> Vec<FieldChange> {
    old.diff_fields()
        .into_iter()
        .zip(new.diff_fields())
        .filter(|((_, before), (_, after))| before != after)
        .map(|((field, before), (_, after))| {
            if T::is_sensitive(field) {
                FieldChange {
                    field,
                    old_value: REDACTED.to_string(),
                    new_value: REDACTED.to_string(),
                }
            } else {
                FieldChange {
                    field,
                    old_value: before,
                    new_value: after,
                }
            }
        })
        .collect()
}

/// Changes folded into the single field/old/new triple of an audit entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub fields: String,
    pub old_values: String,
    pub new_values: String,
}

impl ChangeSummary {
    /// Joins names, old values and new values in corresponding order
    ///
    /// Returns `None` for an empty change list.
    pub fn from_changes(changes: &[FieldChange]) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }

        Some(ChangeSummary {
            fields: join_with(changes, |c| c.field.to_string()),
            old_values: join_with(changes, |c| escape_part(&c.old_value)),
            new_values: join_with(changes, |c| escape_part(&c.new_value)),
        })
    }

    /// Replaces the joined field names with a caller-supplied label
    pub fn labeled(mut self, label: Option<&str>) -> Self {
        if let Some(label) = label {
            self.fields = label.to_string();
        }
        self
    }
}

fn join_with(changes: &[FieldChange], pick: impl Fn(&FieldChange) -> String) -> String {
    changes
        .iter()
        .map(pick)
        .collect::<Vec<_>>()
        .join(&AGGREGATE_SEPARATOR.to_string())
}

fn escape_part(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == AGGREGATE_SEPARATOR {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Splits a joined old/new value back into one value per changed field
pub fn split_aggregate(joined: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = joined.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => current.push(chars.next().unwrap_or('\\')),
            c if c == AGGREGATE_SEPARATOR => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

impl Diffable for User {
    fn diff_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("role", self.role.as_str().to_string()),
        ]
    }

    fn is_sensitive(field: &str) -> bool {
        field == "password"
    }
}

impl Diffable for Project {
    fn diff_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("description", self.description.clone()),
            ("createdAt", format_time(&self.created_at)),
            ("adminId", self.admin_id.to_string()),
            ("taskStates", encode_states(&self.task_states)),
        ]
    }
}

impl Diffable for Task {
    fn diff_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("createdAt", format_time(&self.created_at)),
            ("creatorId", self.creator_id.to_string()),
            ("projectId", self.project_id.to_string()),
            ("assignedId", self.assigned_id.to_string()),
            ("state", encode_state(&self.state)),
            ("role", self.role.as_str().to_string()),
        ]
    }
}
