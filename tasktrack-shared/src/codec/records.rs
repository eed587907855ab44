//! `LineCodec` implementations for every persisted entity.

use uuid::Uuid;

use super::text::{escape, split_fields, split_fields_n, unescape};
use super::{
    encode_optional, format_time, optional_text, parse_time, parse_uuid, LineCodec, ParseError,
    ELEMENT_SEPARATOR, FIELD_SEPARATOR,
};
use crate::models::{ActionType, AuditLog, EntityKind, Project, Role, Task, TaskState, User};

fn join(fields: &[String]) -> String {
    fields.join(&FIELD_SEPARATOR.to_string())
}

fn expect_fields<'a>(
    line: &'a str,
    entity: EntityKind,
    expected: usize,
    label: &'static str,
) -> Result<Vec<&'a str>, ParseError> {
    let fields = split_fields(line, FIELD_SEPARATOR);
    if fields.len() != expected {
        return Err(ParseError::FieldCount {
            entity,
            expected: label,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_role(entity: EntityKind, raw: &str) -> Result<Role, ParseError> {
    Role::parse(raw).ok_or_else(|| ParseError::InvalidField {
        entity,
        field: "role",
        value: raw.to_string(),
        reason: "expected ADMIN or MATE".to_string(),
    })
}

/// Encodes one state as `id,name`
pub fn encode_state(state: &TaskState) -> String {
    format!("{}{}{}", state.id, FIELD_SEPARATOR, escape(&state.name))
}

/// Encodes a state list as `[id,name;id,name]` (`[]` when empty)
pub fn encode_states(states: &[TaskState]) -> String {
    let inner: Vec<String> = states.iter().map(encode_state).collect();
    format!("[{}]", inner.join(&ELEMENT_SEPARATOR.to_string()))
}

/// Decodes a bracketed state list, falling back to an empty list
fn decode_states(raw: &str) -> Vec<TaskState> {
    match try_decode_states(raw) {
        Some(states) => states,
        None => {
            tracing::warn!(
                field = raw,
                "Malformed task state list, treating it as empty"
            );
            Vec::new()
        }
    }
}

fn try_decode_states(raw: &str) -> Option<Vec<TaskState>> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }

    split_fields(inner, ELEMENT_SEPARATOR)
        .into_iter()
        .map(|element| match split_fields(element, FIELD_SEPARATOR).as_slice() {
            [id, name] => Some(TaskState {
                id: Uuid::parse_str(id).ok()?,
                name: unescape(name),
            }),
            _ => None,
        })
        .collect()
}

impl LineCodec for User {
    fn to_line(&self) -> String {
        join(&[
            self.id.to_string(),
            escape(&self.username),
            escape(&self.password),
            self.role.as_str().to_string(),
        ])
    }

    fn from_line(line: &str) -> Result<Self, ParseError> {
        const E: EntityKind = EntityKind::User;
        let f = expect_fields(line, E, 4, "4")?;

        Ok(User {
            id: parse_uuid(E, "userId", f[0])?,
            username: unescape(f[1]),
            password: unescape(f[2]),
            role: parse_role(E, f[3])?,
        })
    }
}

impl LineCodec for Project {
    fn to_line(&self) -> String {
        join(&[
            self.id.to_string(),
            escape(&self.name),
            escape(&self.description),
            format_time(&self.created_at),
            self.admin_id.to_string(),
            encode_states(&self.task_states),
        ])
    }

    fn from_line(line: &str) -> Result<Self, ParseError> {
        const E: EntityKind = EntityKind::Project;
        let f = split_fields_n(line, FIELD_SEPARATOR, 6);
        if f.len() < 5 {
            return Err(ParseError::FieldCount {
                entity: E,
                expected: "5-6",
                found: f.len(),
            });
        }

        // A line written without the bracket field decodes to an empty catalog.
        let task_states = match f.get(5) {
            Some(raw) => decode_states(raw),
            None => Vec::new(),
        };

        Ok(Project {
            id: parse_uuid(E, "projectId", f[0])?,
            name: unescape(f[1]),
            description: unescape(f[2]),
            created_at: parse_time(E, "createdAt", f[3])?,
            admin_id: parse_uuid(E, "adminId", f[4])?,
            task_states,
        })
    }
}

impl LineCodec for Task {
    fn to_line(&self) -> String {
        join(&[
            self.id.to_string(),
            escape(&self.title),
            escape(&self.description),
            format_time(&self.created_at),
            self.creator_id.to_string(),
            self.project_id.to_string(),
            self.assigned_id.to_string(),
            encode_state(&self.state),
            self.role.as_str().to_string(),
        ])
    }

    fn from_line(line: &str) -> Result<Self, ParseError> {
        const E: EntityKind = EntityKind::Task;
        let f = expect_fields(line, E, 10, "10")?;

        Ok(Task {
            id: parse_uuid(E, "taskId", f[0])?,
            title: unescape(f[1]),
            description: unescape(f[2]),
            created_at: parse_time(E, "createdAt", f[3])?,
            creator_id: parse_uuid(E, "creatorId", f[4])?,
            project_id: parse_uuid(E, "projectId", f[5])?,
            assigned_id: parse_uuid(E, "assignedId", f[6])?,
            state: TaskState {
                id: parse_uuid(E, "stateId", f[7])?,
                name: unescape(f[8]),
            },
            role: parse_role(E, f[9])?,
        })
    }
}

impl LineCodec for AuditLog {
    fn to_line(&self) -> String {
        join(&[
            self.id.to_string(),
            self.item_id.to_string(),
            escape(&self.item_name),
            self.user_id.to_string(),
            escape(&self.user_name),
            self.action_type.as_str().to_string(),
            format_time(&self.audit_time),
            encode_optional(self.changed_field.as_deref()),
            encode_optional(self.old_value.as_deref()),
            encode_optional(self.new_value.as_deref()),
        ])
    }

    fn from_line(line: &str) -> Result<Self, ParseError> {
        const E: EntityKind = EntityKind::AuditLog;
        let f = split_fields(line, FIELD_SEPARATOR);
        if !(7..=10).contains(&f.len()) {
            return Err(ParseError::FieldCount {
                entity: E,
                expected: "7-10",
                found: f.len(),
            });
        }

        let action_type = ActionType::parse(f[5]).ok_or_else(|| ParseError::InvalidField {
            entity: E,
            field: "actionType",
            value: f[5].to_string(),
            reason: "expected CREATE, UPDATE or DELETE".to_string(),
        })?;
        let optional = |idx: usize| f.get(idx).and_then(|raw| optional_text(raw));

        Ok(AuditLog {
            id: parse_uuid(E, "auditId", f[0])?,
            item_id: parse_uuid(E, "itemId", f[1])?,
            item_name: unescape(f[2]),
            user_id: parse_uuid(E, "userId", f[3])?,
            user_name: unescape(f[4]),
            action_type,
            audit_time: parse_time(E, "auditTime", f[6])?,
            changed_field: optional(7),
            old_value: optional(8),
            new_value: optional(9),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateTask;
    use crate::session::Session;

    fn project_with(states: Vec<TaskState>) -> Project {
        Project::new("P1", "First, and best", Uuid::new_v4(), states)
    }

    #[test]
    fn test_user_line_layout() {
        let user = User::new("alice", "pw", Role::Admin);
        assert_eq!(user.to_line(), format!("{},alice,pw,ADMIN", user.id));
        assert_eq!(User::from_line(&user.to_line()).unwrap(), user);
    }

    #[test]
    fn test_project_round_trip_with_states() {
        let s1 = TaskState::new("Backlog");
        let s2 = TaskState::new("In Progress");
        let project = project_with(vec![s1.clone(), s2.clone()]);

        let line = project.to_line();
        assert!(line.ends_with(&format!(",[{},Backlog;{},In Progress]", s1.id, s2.id)));
        assert_eq!(Project::from_line(&line).unwrap(), project);
    }

    #[test]
    fn test_project_round_trip_without_states() {
        let project = project_with(vec![]);
        let line = project.to_line();

        assert!(line.ends_with(",[]"));
        assert_eq!(Project::from_line(&line).unwrap(), project);
    }

    #[test]
    fn test_project_absent_state_field_is_empty() {
        let project = project_with(vec![TaskState::new("Backlog")]);
        let line = project.to_line();
        let without = line.rsplit_once(",[").unwrap().0;

        let parsed = Project::from_line(without).unwrap();
        assert!(parsed.task_states.is_empty());
        assert_eq!(parsed.name, project.name);
    }

    #[test]
    fn test_project_malformed_brackets_are_lenient() {
        let project = project_with(vec![TaskState::new("Backlog")]);
        let line = project.to_line();

        let missing_close = line.trim_end_matches(']').to_string();
        assert!(Project::from_line(&missing_close).unwrap().task_states.is_empty());

        let missing_open = line.replacen(",[", ",", 1);
        let parsed = Project::from_line(&missing_open).unwrap();
        assert!(parsed.task_states.is_empty());
        assert_eq!(parsed.id, project.id);

        let bad_element = format!("{},[not-a-uuid,Backlog]", line.rsplit_once(",[").unwrap().0);
        assert!(Project::from_line(&bad_element).unwrap().task_states.is_empty());
    }

    #[test]
    fn test_project_state_names_with_delimiters() {
        let project = project_with(vec![TaskState::new("Review; QA, [x]")]);
        let parsed = Project::from_line(&project.to_line()).unwrap();
        assert_eq!(parsed.task_states[0].name, "Review; QA, [x]");
    }

    #[test]
    fn test_task_round_trip() {
        let task = Task::new(CreateTask {
            title: "Fix login".to_string(),
            description: "multi\nline, text".to_string(),
            creator_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            assigned_id: Uuid::new_v4(),
            state: TaskState::new("Backlog"),
            role: Role::Mate,
        });

        let line = task.to_line();
        assert!(!line.contains('\n'));
        assert!(line.ends_with(&format!(",{},Backlog,MATE", task.state.id)));
        assert_eq!(Task::from_line(&line).unwrap(), task);
    }

    #[test]
    fn test_task_wrong_field_count() {
        let err = Task::from_line("a,b,c").unwrap_err();
        assert_eq!(
            err,
            ParseError::FieldCount {
                entity: EntityKind::Task,
                expected: "10",
                found: 3
            }
        );
    }

    #[test]
    fn test_audit_round_trip_with_and_without_optionals() {
        let session = Session::new(Uuid::new_v4(), "alice", Role::Admin);
        let bare = AuditLog::new(Uuid::new_v4(), "P1", &session, ActionType::Delete);

        let line = bare.to_line();
        assert!(line.ends_with(",,,"));
        assert_eq!(AuditLog::from_line(&line).unwrap(), bare);

        let full = bare
            .clone()
            .with_old_value("[a,b;c,d]")
            .with_new_value("[]");
        assert_eq!(AuditLog::from_line(&full.to_line()).unwrap(), full);
    }

    #[test]
    fn test_audit_trailing_fields_omitted() {
        let session = Session::new(Uuid::new_v4(), "alice", Role::Admin);
        let entry = AuditLog::new(Uuid::new_v4(), "P1", &session, ActionType::Create);
        let line = entry.to_line();
        let trimmed = line.trim_end_matches(',');

        assert_eq!(AuditLog::from_line(trimmed).unwrap(), entry);
    }

    #[test]
    fn test_invalid_role_rejected() {
        let line = format!("{},bob,pw,OWNER", Uuid::new_v4());
        assert!(matches!(
            User::from_line(&line),
            Err(ParseError::InvalidField { field: "role", .. })
        ));
    }
}
