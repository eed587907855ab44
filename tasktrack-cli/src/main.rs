//! TaskTrack operator CLI
//!
//! Inspects the records of a TaskTrack data directory and seeds the first
//! administrator account.
//!
//! # Usage
//!
//! ```bash
//! tasktrack init-admin --username root --password secret
//! tasktrack projects
//! tasktrack tasks --project <PROJECT_ID>
//! tasktrack audit --project <PROJECT_ID>
//! ```
//!
//! Storage is selected through `TASKTRACK_BACKEND` and `TASKTRACK_DATA_DIR`
//! (see `tasktrack_shared::config`).

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tasktrack_shared::backend::Backend;
use tasktrack_shared::codec::format_time;
use tasktrack_shared::config::StorageConfig;
use tasktrack_shared::models::{AuditLog, Entity, Role, User};
use tasktrack_shared::repository::{TaskQueries, UserQueries};
use tasktrack_shared::session::Session;
use tasktrack_shared::telemetry;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "tasktrack", version, about = "TaskTrack record inspection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the first administrator and store it as the current session
    InitAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// List users
    Users,

    /// List projects with their task states
    Projects,

    /// List the tasks of one project
    Tasks {
        #[arg(long)]
        project: Uuid,
    },

    /// Show audit history, newest first
    Audit(AuditArgs),
}

#[derive(Debug, Args)]
#[group(multiple = false)]
struct AuditArgs {
    /// History of a project and all of its tasks
    #[arg(long)]
    project: Option<Uuid>,

    /// History of a single user, project or task
    #[arg(long)]
    item: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing(telemetry::DEFAULT_FILTER)?;

    let cli = Cli::parse();
    let config = StorageConfig::from_env().context("invalid storage configuration")?;
    tracing::debug!(backend = %config.backend, data_dir = %config.data_dir.display(), "Configuration loaded");

    let backend = Backend::from_config(&config)?;

    match cli.command {
        Command::InitAdmin { username, password } => init_admin(&backend, username, password).await,
        Command::Users => list_users(&backend).await,
        Command::Projects => list_projects(&backend).await,
        Command::Tasks { project } => list_tasks(&backend, project).await,
        Command::Audit(args) => show_audit(&backend, args).await,
    }
}

async fn init_admin(backend: &Backend, username: String, password: String) -> anyhow::Result<()> {
    if backend.users.find_by_username(&username).await?.is_some() {
        anyhow::bail!("user '{}' already exists", username);
    }

    let admin = backend
        .users
        .create(&Session::system(), User::new(username, password, Role::Admin))
        .await?;
    backend.sessions.save(&admin).await?;

    println!("Created administrator {} ({})", admin.username, admin.id);
    Ok(())
}

async fn list_users(backend: &Backend) -> anyhow::Result<()> {
    for user in backend.users.list().await? {
        println!("{}  {}", user.id, user.display_form());
    }
    Ok(())
}

async fn list_projects(backend: &Backend) -> anyhow::Result<()> {
    for project in backend.projects.list().await? {
        println!("{}  {}", project.id, project.display_form());
        for state in &project.task_states {
            println!("    - {}", state.name);
        }
    }
    Ok(())
}

async fn list_tasks(backend: &Backend, project_id: Uuid) -> anyhow::Result<()> {
    // Fails early with NotFound for an unknown project
    let project = backend.projects.get_by_id(project_id).await?;
    println!("{}", project.display_form());

    for task in backend.tasks.list_by_project(project_id).await? {
        println!("{}  {}", task.id, task.display_form());
    }
    Ok(())
}

async fn show_audit(backend: &Backend, args: AuditArgs) -> anyhow::Result<()> {
    let entries = match (args.project, args.item) {
        (Some(project), _) => backend.audit.get_project_audit_logs(project).await?,
        (None, Some(item)) => backend.audit.get_by_item_id(item).await?,
        (None, None) => backend.audit.list().await?,
    };

    for entry in &entries {
        println!("{}", describe(entry));
    }
    Ok(())
}

fn describe(entry: &AuditLog) -> String {
    let mut line = format!(
        "{}  {:<6}  {} by {}",
        format_time(&entry.audit_time),
        entry.action_type.as_str(),
        entry.item_name,
        entry.user_name
    );

    if let Some(field) = &entry.changed_field {
        line.push_str(&format!("  [{}]", field));
    }
    match (&entry.old_value, &entry.new_value) {
        (Some(old), Some(new)) => line.push_str(&format!("  {} -> {}", old, new)),
        (Some(old), None) => line.push_str(&format!("  was {}", old)),
        (None, Some(new)) => line.push_str(&format!("  {}", new)),
        (None, None) => {}
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tasktrack_shared::models::ActionType;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_audit_flags_are_exclusive() {
        let id = Uuid::new_v4().to_string();
        let result = Cli::try_parse_from([
            "tasktrack", "audit", "--project", id.as_str(), "--item", id.as_str(),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_update() {
        let entry = AuditLog::new(Uuid::new_v4(), "Fix login", &Session::system(), ActionType::Update)
            .with_old_value("a")
            .with_new_value("b");
        let line = describe(&entry);
        assert!(line.contains("Fix login by system"));
        assert!(line.ends_with("a -> b"));
    }
}
