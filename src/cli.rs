use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::database::Database;
use crate::database::DatabaseError;
use crate::models::{Category, NewTask, priority_value};
use crate::utils::parse_date;
use crate::workspace::{Project, Workspace};

#[derive(Parser)]
#[command(name = "taskmaster")]
#[command(about = "Kanban task board backend with an HTTP API")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default if no subcommand)
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Quickly add a new task to the Backlog
    AddTask {
        /// Task title
        title: String,
        /// Project the task belongs to
        #[arg(long)]
        project: Option<i64>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Priority: High, Medium, Low or a number
        #[arg(long)]
        priority: Option<String>,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
    },
    /// Move a task to another category (Backlog, Doing, Review, Done)
    MoveTask {
        /// Task ID
        id: i64,
        /// Target category
        status: String,
    },
    /// Print a project's board
    Board {
        /// Project ID
        project_id: i64,
        /// Only show tasks with this priority label
        #[arg(long)]
        priority: Option<String>,
    },
    /// Print every user with their projects
    Summary,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid priority '{0}' (expected High, Medium, Low or a number)")]
    InvalidPriority(String),
    #[error("Project {0} not found")]
    ProjectNotFound(i64),
}

/// Handle the add-task command
pub fn handle_add_task(
    title: String,
    project: Option<i64>,
    due: Option<String>,
    priority: Option<String>,
    description: Option<String>,
    db: &Database,
) -> Result<(), CliError> {
    if let Some(due_str) = &due {
        parse_date(due_str).map_err(|e| {
            CliError::DateParseError(format!("Invalid date format '{}': {}", due_str, e))
        })?;
    }

    let mut task = NewTask::new(title);
    task.project_id = project;
    task.due_date = due;
    task.description = description;
    if let Some(label) = priority {
        task.priority = priority_value(&label).ok_or(CliError::InvalidPriority(label))?;
    }

    let created = db.insert_task(&task)?;
    println!("Task created successfully (ID: {})", created.id);

    Ok(())
}

/// Handle the move-task command
pub fn handle_move_task(id: i64, status: &str, db: &Database) -> Result<(), CliError> {
    let moved = db.transition_task(id, status)?;
    println!("Task {} moved to {}", moved.id, moved.status);
    Ok(())
}

/// Handle the board command
pub fn handle_board(
    project_id: i64,
    priority: Option<&str>,
    db: &Database,
) -> Result<(), CliError> {
    let project = db
        .load_project(project_id)?
        .ok_or(CliError::ProjectNotFound(project_id))?;
    print!("{}", render_board(&project, priority));
    Ok(())
}

/// Handle the summary command
pub fn handle_summary(db: &Database) -> Result<(), CliError> {
    let workspace = db.load_workspace()?;
    print!("{}", render_summary(&workspace));
    Ok(())
}

/// Text rendering of a project's board. With a priority, a single flat list
/// of matching tasks is printed instead of the four columns.
pub fn render_board(project: &Project, priority: Option<&str>) -> String {
    let mut out = String::new();
    let status = if project.is_complete() { "complete" } else { "open" };
    let _ = writeln!(
        out,
        "Project {} (due {}, {})",
        project.id(),
        project.deadline(),
        status
    );

    let store = project.tasks();
    match priority {
        Some(priority) => {
            let _ = writeln!(out, "\n{} priority:", priority);
            for task in store.filter_by_priority(priority) {
                let _ = writeln!(out, "  #{} {} [{}]", task.id, task.name, task.status);
            }
        }
        None => {
            for category in Category::ALL {
                let tasks = store.tasks_in(category);
                let _ = writeln!(out, "\n{} ({})", category, tasks.len());
                for task in tasks {
                    let _ = writeln!(out, "  #{} {} [{}]", task.id, task.name, task.priority);
                }
            }
        }
    }
    out
}

pub fn render_summary(workspace: &Workspace) -> String {
    let mut out = String::new();
    for user in workspace.users() {
        let _ = writeln!(out, "{} <{}>", user.name(), user.email());
        let projects = workspace.projects_of(user.id()).unwrap_or_default();
        if projects.is_empty() {
            let _ = writeln!(out, "  (no projects)");
        }
        for project in projects {
            let [backlog, doing, review, done] = project.tasks().counts();
            let _ = writeln!(
                out,
                "  project {} due {}: {} backlog, {} doing, {} review, {} done",
                project.id(),
                project.deadline(),
                backlog.1,
                doing.1,
                review.1,
                done.1
            );
        }
    }
    out
}
