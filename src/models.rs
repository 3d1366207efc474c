use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kanban column a task lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Backlog,
    Doing,
    Review,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category '{0}' (expected Backlog, Doing, Review or Done)")]
pub struct InvalidCategory(pub String);

impl Category {
    /// All categories in board order
    pub const ALL: [Category; 4] = [
        Category::Backlog,
        Category::Doing,
        Category::Review,
        Category::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Backlog => "Backlog",
            Category::Doing => "Doing",
            Category::Review => "Review",
            Category::Done => "Done",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = InvalidCategory;

    // Exact, case-sensitive match only
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Backlog" => Ok(Category::Backlog),
            "Doing" => Ok(Category::Doing),
            "Review" => Ok(Category::Review),
            "Done" => Ok(Category::Done),
            other => Err(InvalidCategory(other.to_string())),
        }
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A task as held by a [`crate::store::TaskStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub date: String, // caller-formatted, not validated
    pub status: Category,
    pub priority: String,
    #[serde(default)]
    pub description: String,
}

impl Task {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        date: impl Into<String>,
        status: Category,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            date: date.into(),
            status,
            priority: priority.into(),
            description: String::new(),
        }
    }
}

/// Field-level edit applied to a stored task. Status is not editable here;
/// it only changes through a store transition.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub name: Option<String>,
    pub date: Option<String>,
    pub priority: Option<String>,
    pub description: Option<String>,
}

impl TaskEdit {
    pub fn apply(self, task: &mut Task) {
        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
    }
}

/// Render a stored integer priority as the label used by the store
pub fn priority_label(priority: i64) -> String {
    match priority {
        1 => "High".to_string(),
        2 => "Medium".to_string(),
        3 => "Low".to_string(),
        other => other.to_string(),
    }
}

/// Inverse of [`priority_label`]
pub fn priority_value(label: &str) -> Option<i64> {
    match label.trim() {
        "High" => Some(1),
        "Medium" => Some(2),
        "Low" => Some(3),
        other => other.parse().ok(),
    }
}

// Persistent rows

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: i64,
    pub status: Category,
    pub project_id: Option<i64>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Task {
            id: record.id,
            name: record.title,
            date: record.due_date.unwrap_or_default(),
            status: record.status,
            priority: priority_label(record.priority),
            description: record.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            priority: default_priority(),
            project_id: None,
        }
    }
}

fn default_priority() -> i64 {
    1
}

/// Partial update of a task row; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<Category>,
    pub project_id: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.project_id.is_none()
    }
}

/// Optional filters for listing tasks; all present filters must match
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<Category>,
    pub project_id: Option<i64>,
    pub priority: Option<i64>,
}

/// A user row without its password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub deadline: String,
    pub date: Option<String>,
    pub completion_status: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub deadline: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub completion_status: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub deadline: Option<String>,
    pub date: Option<String>,
    pub completion_status: Option<bool>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.deadline.is_none() && self.date.is_none() && self.completion_status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_exact() {
        assert_eq!("Doing".parse::<Category>(), Ok(Category::Doing));
        assert!("doing".parse::<Category>().is_err());
        assert!(" Done".parse::<Category>().is_err());
        assert_eq!(
            "NotACategory".parse::<Category>(),
            Err(InvalidCategory("NotACategory".to_string()))
        );
    }

    #[test]
    fn priority_labels_map_both_ways() {
        assert_eq!(priority_label(1), "High");
        assert_eq!(priority_label(3), "Low");
        assert_eq!(priority_label(7), "7");
        assert_eq!(priority_value("Medium"), Some(2));
        assert_eq!(priority_value("7"), Some(7));
        assert_eq!(priority_value("urgent"), None);
    }

    #[test]
    fn task_record_converts_into_store_task() {
        let record = TaskRecord {
            id: 4,
            title: "Ship".to_string(),
            description: None,
            due_date: Some("2024-03-01".to_string()),
            priority: 2,
            status: Category::Review,
            project_id: Some(1),
        };
        let task = Task::from(record);
        assert_eq!(task.name, "Ship");
        assert_eq!(task.date, "2024-03-01");
        assert_eq!(task.priority, "Medium");
        assert_eq!(task.status, Category::Review);
        assert_eq!(task.description, "");
    }
}
