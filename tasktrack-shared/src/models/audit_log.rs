/// Audit log model
///
/// Audit entries are append-only and never modified after creation. Each
/// create/update/delete of a user, project or task writes exactly one entry.
/// `item_id` is a non-owning back-reference used only for lookups.
///
/// # Line format
///
/// ```text
/// auditId,itemId,itemName,userId,userName,actionType,auditTime,changedField,oldValue,newValue
/// ```
///
/// The trailing three fields are optional and stored as empty strings when absent.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::now;
use crate::diff::ChangeSummary;
use crate::session::Session;

/// Kind of mutation an audit entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl ActionType {
    /// Converts action to its stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "CREATE",
            ActionType::Update => "UPDATE",
            ActionType::Delete => "DELETE",
        }
    }

    /// Parses action from its stored form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(ActionType::Create),
            "UPDATE" => Some(ActionType::Update),
            "DELETE" => Some(ActionType::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique audit entry ID
    pub id: Uuid,

    /// Id of the project, task or user described
    pub item_id: Uuid,

    /// Name of the item at the time of the action
    pub item_name: String,

    /// Acting user
    pub user_id: Uuid,

    /// Acting user's name at the time of the action
    pub user_name: String,

    /// Mutation kind
    pub action_type: ActionType,

    /// When the action happened (local time)
    pub audit_time: NaiveDateTime,

    /// Changed field name(s); joined with `|` when several changed
    pub changed_field: Option<String>,

    /// Previous value(s); an empty value is kept as `None`
    pub old_value: Option<String>,

    /// New value(s); an empty value is kept as `None`
    pub new_value: Option<String>,
}

impl AuditLog {
    /// Creates an entry for `item` performed by the session's user, stamped now
    pub fn new(
        item_id: Uuid,
        item_name: impl Into<String>,
        actor: &Session,
        action_type: ActionType,
    ) -> Self {
        AuditLog {
            id: Uuid::new_v4(),
            item_id,
            item_name: item_name.into(),
            user_id: actor.user_id,
            user_name: actor.username.clone(),
            action_type,
            audit_time: now(),
            changed_field: None,
            old_value: None,
            new_value: None,
        }
    }

    /// Sets the audit time (used when replaying or importing entries)
    pub fn at(mut self, audit_time: NaiveDateTime) -> Self {
        self.audit_time = audit_time;
        self
    }

    /// Records the old value; an empty value is stored as absent
    pub fn with_old_value(mut self, value: impl Into<String>) -> Self {
        self.old_value = present(value.into());
        self
    }

    /// Records the new value; an empty value is stored as absent
    pub fn with_new_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = present(value.into());
        self
    }

    /// Records a diff summary as changed field / old value / new value
    ///
    /// Empty parts are stored as absent, as with the single-value setters.
    pub fn with_changes(mut self, summary: ChangeSummary) -> Self {
        self.changed_field = present(summary.fields);
        self.old_value = present(summary.old_values);
        self.new_value = present(summary.new_values);
        self
    }
}

/// Empty text means "no value" in every backend
fn present(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LineCodec;
    use crate::diff::{diff, ChangeSummary};
    use crate::models::{Project, Role};

    #[test]
    fn test_action_type_round_trip() {
        for action in [ActionType::Create, ActionType::Update, ActionType::Delete] {
            assert_eq!(ActionType::parse(action.as_str()), Some(action));
        }
        assert_eq!(ActionType::parse("create"), None);
    }

    #[test]
    fn test_new_entry_takes_actor_from_session() {
        let session = Session::new(Uuid::new_v4(), "alice", Role::Admin);
        let item = Uuid::new_v4();

        let entry = AuditLog::new(item, "Website", &session, ActionType::Create)
            .with_new_value("Website - relaunch");

        assert_eq!(entry.item_id, item);
        assert_eq!(entry.user_id, session.user_id);
        assert_eq!(entry.user_name, "alice");
        assert_eq!(entry.changed_field, None);
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value.as_deref(), Some("Website - relaunch"));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let entry = AuditLog::new(Uuid::new_v4(), "x", &Session::system(), ActionType::Update)
            .with_old_value("")
            .with_new_value("filled");

        assert_eq!(entry.old_value, None);
        assert_eq!(AuditLog::from_line(&entry.to_line()).unwrap(), entry);
    }

    #[test]
    fn test_change_from_empty_description_round_trips() {
        let before = Project::new("P", "", Uuid::new_v4(), vec![]);
        let after = Project {
            description: "filled".to_string(),
            ..before.clone()
        };
        let summary = ChangeSummary::from_changes(&diff(&before, &after)).unwrap();

        let entry = AuditLog::new(before.id, "P", &Session::system(), ActionType::Update)
            .with_changes(summary);

        assert_eq!(entry.changed_field.as_deref(), Some("description"));
        assert_eq!(entry.old_value, None);
        assert_eq!(entry.new_value.as_deref(), Some("filled"));
        assert_eq!(AuditLog::from_line(&entry.to_line()).unwrap(), entry);
    }
}
