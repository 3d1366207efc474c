use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    NewProject, NewTask, NewUser, ProjectPatch, ProjectRecord, Task, TaskFilter, TaskPatch,
    TaskRecord, UserRecord,
};
use crate::password;
use crate::store::{StoreError, TaskStore};
use crate::utils::get_current_date_string;
use crate::workspace::{Project, User, Workspace};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("A user with email '{0}' already exists")]
    EmailTaken(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("User {user_id} is already assigned to project {project_id}")]
    AlreadyAssigned { user_id: i64, project_id: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, project_id";
const PROJECT_COLUMNS: &str = "id, deadline, date, completion_status";

/// Handle on the SQLite database. Opened explicitly and closed when dropped.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` and initialize the schema
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let db_path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(db_path)?;
        info!(path = %db_path.display(), "Opened database");
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT UNIQUE NOT NULL,
                password        TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                deadline            TEXT NOT NULL,
                date                TEXT,
                completion_status   INTEGER DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS user_projects (
                user_id         INTEGER,
                project_id      INTEGER,
                PRIMARY KEY (user_id, project_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                description     TEXT,
                due_date        TEXT,
                priority        INTEGER DEFAULT 1,
                status          TEXT NOT NULL DEFAULT 'Backlog',
                position        INTEGER NOT NULL DEFAULT 0,
                project_id      INTEGER,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
            [],
        )?;

        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ---------------------------------------------------------------- tasks

    fn row_to_task(row: &rusqlite::Row) -> Result<TaskRecord, rusqlite::Error> {
        Ok(TaskRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            due_date: row.get(3)?,
            priority: row.get(4)?,
            status: row.get(5)?,
            project_id: row.get(6)?,
        })
    }

    /// Insert a task into the Backlog and return the stored row
    pub fn insert_task(&self, task: &NewTask) -> Result<TaskRecord, DatabaseError> {
        if let Some(project_id) = task.project_id {
            self.require_project(project_id)?;
        }
        self.conn.execute(
            "INSERT INTO tasks
                 (title, description, due_date, priority, status, position, project_id)
             VALUES
                 (?1, ?2, ?3, ?4, 'Backlog',
                  (SELECT COALESCE(MAX(position), 0) + 1 FROM tasks), ?5)",
            rusqlite::params![
                task.title,
                task.description,
                task.due_date,
                task.priority,
                task.project_id
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(task_id = id, "Inserted task");
        self.get_task(id)?
            .ok_or(DatabaseError::NotFound { entity: "task", id })
    }

    /// Get a single task by ID
    pub fn get_task(&self, id: i64) -> Result<Option<TaskRecord>, DatabaseError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        let task = self
            .conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_task)
            .optional()?;
        Ok(task)
    }

    /// List tasks matching every filter that is set, ordered by id
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, DatabaseError> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(Box::new(status));
        }
        if let Some(project_id) = filter.project_id {
            conditions.push("project_id = ?");
            values.push(Box::new(project_id));
        }
        if let Some(priority) = filter.priority {
            conditions.push("priority = ?");
            values.push(Box::new(priority));
        }

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Apply a partial update to a task. Returns `None` when the task does
    /// not exist. A status change is a single UPDATE, so the task is never
    /// without a category.
    pub fn update_task(
        &self,
        id: i64,
        patch: &TaskPatch,
    ) -> Result<Option<TaskRecord>, DatabaseError> {
        if let Some(project_id) = patch.project_id {
            self.require_project(project_id)?;
        }

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(due_date) = &patch.due_date {
            assignments.push("due_date = ?");
            values.push(Box::new(due_date.clone()));
        }
        if let Some(priority) = patch.priority {
            assignments.push("priority = ?");
            values.push(Box::new(priority));
        }
        if let Some(status) = patch.status {
            // entering a category puts the task at its end
            assignments.push("status = ?");
            assignments.push("position = (SELECT COALESCE(MAX(position), 0) + 1 FROM tasks)");
            values.push(Box::new(status));
        }
        if let Some(project_id) = patch.project_id {
            assignments.push("project_id = ?");
            values.push(Box::new(project_id));
        }

        if assignments.is_empty() {
            return self.get_task(id);
        }

        values.push(Box::new(id));
        let sql = format!("UPDATE tasks SET {} WHERE id = ?", assignments.join(", "));

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        tx.commit()?;

        if changed == 0 {
            return Ok(None);
        }
        debug!(task_id = id, "Updated task");
        self.get_task(id)
    }

    /// Move a task to the category named by `new_status`.
    ///
    /// The task's project board is loaded and the transition runs through
    /// [`TaskStore::update_status`], so an unknown category is rejected before
    /// anything is written.
    pub fn transition_task(&self, id: i64, new_status: &str) -> Result<TaskRecord, DatabaseError> {
        let record = self
            .get_task(id)?
            .ok_or(DatabaseError::NotFound { entity: "task", id })?;

        let mut store = match record.project_id {
            Some(project_id) => self.load_task_store(project_id)?,
            None => {
                let mut store = TaskStore::new();
                store.restore(Task::from(record.clone()))?;
                store
            }
        };
        let moved = store.update_status(id, new_status)?;

        let patch = TaskPatch {
            status: Some(moved.status),
            ..TaskPatch::default()
        };
        info!(task_id = id, from = %record.status, to = %moved.status, "Task moved");
        self.update_task(id, &patch)?
            .ok_or(DatabaseError::NotFound { entity: "task", id })
    }

    /// Delete a task by ID, returning whether a row was removed
    pub fn delete_task(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM tasks WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Every task across the projects a user participates in
    pub fn tasks_for_user(&self, user_id: i64) -> Result<Vec<TaskRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.title, t.description, t.due_date, t.priority, t.status, t.project_id
             FROM tasks t
             JOIN user_projects up ON t.project_id = up.project_id
             WHERE up.user_id = ?1
             ORDER BY t.id ASC",
        )?;
        let tasks = stmt
            .query_map(rusqlite::params![user_id], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Remove every task; returns how many were deleted
    pub fn delete_all_tasks(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM tasks", [])?)
    }

    // ---------------------------------------------------------------- users

    fn row_to_user(row: &rusqlite::Row) -> Result<UserRecord, rusqlite::Error> {
        Ok(UserRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
        })
    }

    /// Create a user, storing a salted hash of the password
    pub fn insert_user(&self, user: &NewUser) -> Result<UserRecord, DatabaseError> {
        if self.get_user_by_email(&user.email)?.is_some() {
            return Err(DatabaseError::EmailTaken(user.email.clone()));
        }
        self.conn.execute(
            "INSERT INTO users (name, email, password) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                user.name,
                user.email,
                password::hash_password(&user.password)
            ],
        )?;
        Ok(UserRecord {
            id: self.conn.last_insert_rowid(),
            name: user.name.clone(),
            email: user.email.clone(),
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email FROM users ORDER BY id ASC")?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                rusqlite::params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, email FROM users WHERE email = ?1",
                rusqlite::params![email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Check credentials; `login` may be either the email or the name
    pub fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, password FROM users
             WHERE email = ?1 OR name = ?1 ORDER BY id ASC",
        )?;
        let candidates = stmt
            .query_map(rusqlite::params![login], |row| {
                Ok((Self::row_to_user(row)?, row.get::<_, String>(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(candidates
            .into_iter()
            .find(|(_, stored)| password::verify_password(password, stored))
            .map(|(user, _)| user))
    }

    /// Delete a user. Projects left without any member are deleted too.
    pub fn delete_user(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        let project_ids = {
            let mut stmt = tx.prepare("SELECT project_id FROM user_projects WHERE user_id = ?1")?;
            let ids = stmt
                .query_map(rusqlite::params![id], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let changed = tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?;

        for project_id in project_ids {
            let reclaimed = tx.execute(
                "DELETE FROM projects WHERE id = ?1
                 AND NOT EXISTS (SELECT 1 FROM user_projects WHERE project_id = ?1)",
                rusqlite::params![project_id],
            )?;
            if reclaimed > 0 {
                debug!(project_id, user_id = id, "Reclaimed project without members");
            }
        }

        tx.commit()?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------- projects

    fn row_to_project(row: &rusqlite::Row) -> Result<ProjectRecord, rusqlite::Error> {
        Ok(ProjectRecord {
            id: row.get(0)?,
            deadline: row.get(1)?,
            date: row.get(2)?,
            completion_status: row.get::<_, i64>(3)? != 0,
        })
    }

    /// Insert a project; the creation date defaults to today
    pub fn insert_project(&self, project: &NewProject) -> Result<ProjectRecord, DatabaseError> {
        let date = project.date.clone().unwrap_or_else(get_current_date_string);
        self.conn.execute(
            "INSERT INTO projects (deadline, date, completion_status) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                project.deadline,
                date,
                if project.completion_status { 1 } else { 0 }
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .ok_or(DatabaseError::NotFound { entity: "project", id })
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRecord>, DatabaseError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let projects = stmt
            .query_map([], Self::row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<ProjectRecord>, DatabaseError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
        let project = self
            .conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_project)
            .optional()?;
        Ok(project)
    }

    fn require_project(&self, id: i64) -> Result<(), DatabaseError> {
        match self.get_project(id)? {
            Some(_) => Ok(()),
            None => Err(DatabaseError::NotFound { entity: "project", id }),
        }
    }

    /// Apply a partial update to a project; `None` when it does not exist
    pub fn update_project(
        &self,
        id: i64,
        patch: &ProjectPatch,
    ) -> Result<Option<ProjectRecord>, DatabaseError> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(deadline) = &patch.deadline {
            assignments.push("deadline = ?");
            values.push(Box::new(deadline.clone()));
        }
        if let Some(date) = &patch.date {
            assignments.push("date = ?");
            values.push(Box::new(date.clone()));
        }
        if let Some(complete) = patch.completion_status {
            assignments.push("completion_status = ?");
            values.push(Box::new(if complete { 1 } else { 0 }));
        }

        if assignments.is_empty() {
            return self.get_project(id);
        }

        values.push(Box::new(id));
        let sql = format!("UPDATE projects SET {} WHERE id = ?", assignments.join(", "));

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        tx.commit()?;

        if changed == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    /// Delete a project; its tasks and memberships go with it
    pub fn delete_project(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM projects WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Projects a user participates in
    pub fn projects_for_user(&self, user_id: i64) -> Result<Vec<ProjectRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.deadline, p.date, p.completion_status
             FROM projects p
             JOIN user_projects up ON p.id = up.project_id
             WHERE up.user_id = ?1
             ORDER BY p.id ASC",
        )?;
        let projects = stmt
            .query_map(rusqlite::params![user_id], Self::row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Put a user on a project
    pub fn assign_user(&self, user_id: i64, project_id: i64) -> Result<(), DatabaseError> {
        if self.get_user(user_id)?.is_none() {
            return Err(DatabaseError::NotFound { entity: "user", id: user_id });
        }
        self.require_project(project_id)?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO user_projects (user_id, project_id) VALUES (?1, ?2)",
            rusqlite::params![user_id, project_id],
        )?;
        if inserted == 0 {
            return Err(DatabaseError::AlreadyAssigned { user_id, project_id });
        }
        Ok(())
    }

    /// Remove every project (and, through the cascade, their tasks)
    pub fn delete_all_projects(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM projects", [])?)
    }

    // ------------------------------------------------------------ hydration

    fn member_ids(&self, project_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM user_projects WHERE project_id = ?1 ORDER BY user_id")?;
        let ids = stmt
            .query_map(rusqlite::params![project_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Rebuild a project's board. Rows are restored in position order, so
    /// each category keeps the order tasks entered it.
    fn load_task_store(&self, project_id: i64) -> Result<TaskStore, DatabaseError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY position ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(rusqlite::params![project_id], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut store = TaskStore::new();
        for record in records {
            store.restore(Task::from(record))?;
        }
        Ok(store)
    }

    fn record_to_project(&self, record: ProjectRecord) -> Result<Project, DatabaseError> {
        let mut project = Project::with_date(
            record.id,
            record.date.unwrap_or_default(),
            record.deadline,
        );
        project.mark_complete(record.completion_status);
        for user_id in self.member_ids(record.id)? {
            project.add_user(user_id);
        }
        *project.tasks_mut() = self.load_task_store(record.id)?;
        Ok(project)
    }

    /// Load a project with its members and its task board
    pub fn load_project(&self, id: i64) -> Result<Option<Project>, DatabaseError> {
        match self.get_project(id)? {
            Some(record) => Ok(Some(self.record_to_project(record)?)),
            None => Ok(None),
        }
    }

    /// Load every user and project into an in-memory workspace
    pub fn load_workspace(&self) -> Result<Workspace, DatabaseError> {
        let mut workspace = Workspace::new();

        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, password FROM users ORDER BY id ASC")?;
        let users = stmt
            .query_map([], |row| {
                Ok(User::with_hash(
                    row.get(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for user in users {
            workspace.insert_user(user);
        }

        for record in self.list_projects()? {
            let project = self.record_to_project(record)?;
            let project_id = project.id();
            let members: Vec<i64> = project.users().collect();
            workspace.insert_project(project);
            for user_id in members {
                // membership rows cascade with their user, so this only
                // trips on a hand-edited database
                if workspace.assign(user_id, project_id).is_err() {
                    debug!(user_id, project_id, "Skipping dangling membership");
                }
            }
        }

        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use rstest::{fixture, rstest};

    #[fixture]
    fn db() -> Database {
        Database::in_memory().unwrap()
    }

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "pw".to_string(),
        }
    }

    fn new_project(db: &Database, deadline: &str) -> ProjectRecord {
        db.insert_project(&NewProject {
            deadline: deadline.to_string(),
            date: None,
            completion_status: false,
        })
        .unwrap()
    }

    fn task_in(project_id: i64, title: &str, priority: i64) -> NewTask {
        NewTask {
            project_id: Some(project_id),
            priority,
            ..NewTask::new(title)
        }
    }

    #[rstest]
    fn insert_task_echoes_row_in_backlog(db: Database) {
        let project = new_project(&db, "2030-01-01");
        let created = db
            .insert_task(&NewTask {
                description: Some("details".to_string()),
                due_date: Some("2030-01-02".to_string()),
                ..task_in(project.id, "write", 2)
            })
            .unwrap();

        assert_eq!(created.title, "write");
        assert_eq!(created.status, Category::Backlog);
        assert_eq!(created.priority, 2);
        assert_eq!(created.project_id, Some(project.id));
        assert_eq!(db.get_task(created.id).unwrap(), Some(created));
    }

    #[rstest]
    fn insert_task_into_missing_project_fails(db: Database) {
        let err = db.insert_task(&task_in(77, "orphan", 1)).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "project", id: 77 }));
    }

    #[rstest]
    fn list_tasks_applies_every_filter(db: Database) {
        let a = new_project(&db, "2030-01-01");
        let b = new_project(&db, "2030-01-01");
        let t1 = db.insert_task(&task_in(a.id, "one", 1)).unwrap();
        db.insert_task(&task_in(a.id, "two", 2)).unwrap();
        db.insert_task(&task_in(b.id, "three", 1)).unwrap();
        db.transition_task(t1.id, "Doing").unwrap();

        let by_project = db
            .list_tasks(&TaskFilter { project_id: Some(a.id), ..TaskFilter::default() })
            .unwrap();
        assert_eq!(by_project.len(), 2);

        let combined = db
            .list_tasks(&TaskFilter {
                status: Some(Category::Doing),
                project_id: Some(a.id),
                priority: Some(1),
            })
            .unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].id, t1.id);

        assert_eq!(db.list_tasks(&TaskFilter::default()).unwrap().len(), 3);
    }

    #[rstest]
    fn partial_patch_touches_only_given_columns(db: Database) {
        let task = db.insert_task(&NewTask::new("draft")).unwrap();
        let patch = TaskPatch {
            title: Some("final".to_string()),
            priority: Some(3),
            ..TaskPatch::default()
        };
        let updated = db.update_task(task.id, &patch).unwrap().unwrap();
        assert_eq!(updated.title, "final");
        assert_eq!(updated.priority, 3);
        assert_eq!(updated.description, task.description);
        assert_eq!(updated.status, Category::Backlog);

        assert!(db.update_task(999, &patch).unwrap().is_none());
    }

    #[rstest]
    fn transition_rejects_unknown_category_without_writing(db: Database) {
        let project = new_project(&db, "2030-01-01");
        let task = db.insert_task(&task_in(project.id, "t", 1)).unwrap();

        let err = db.transition_task(task.id, "Archived").unwrap_err();
        assert!(matches!(err, DatabaseError::Store(StoreError::InvalidCategory(_))));
        assert_eq!(db.get_task(task.id).unwrap().unwrap().status, Category::Backlog);

        let moved = db.transition_task(task.id, "Review").unwrap();
        assert_eq!(moved.status, Category::Review);
    }

    #[rstest]
    fn transition_of_missing_task_is_not_found(db: Database) {
        let err = db.transition_task(5, "Done").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "task", id: 5 }));
    }

    #[rstest]
    fn delete_task_reports_whether_it_removed(db: Database) {
        let task = db.insert_task(&NewTask::new("gone")).unwrap();
        assert!(db.delete_task(task.id).unwrap());
        assert!(!db.delete_task(task.id).unwrap());
    }

    #[rstest]
    fn deleting_a_project_cascades_to_tasks(db: Database) {
        let project = new_project(&db, "2030-01-01");
        let task = db.insert_task(&task_in(project.id, "t", 1)).unwrap();
        assert!(db.delete_project(project.id).unwrap());
        assert!(db.get_task(task.id).unwrap().is_none());
    }

    #[rstest]
    fn emails_are_unique(db: Database) {
        db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let err = db.insert_user(&new_user("other", "ada@example.com")).unwrap_err();
        assert!(matches!(err, DatabaseError::EmailTaken(_)));
    }

    #[rstest]
    fn passwords_are_not_stored_in_plaintext(db: Database) {
        db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let stored: String = db
            .conn()
            .query_row("SELECT password FROM users", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, "pw");
    }

    #[rstest]
    fn login_by_name_or_email(db: Database) {
        let ada = db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        assert_eq!(db.authenticate("ada", "pw").unwrap(), Some(ada.clone()));
        assert_eq!(db.authenticate("ada@example.com", "pw").unwrap(), Some(ada));
        assert_eq!(db.authenticate("ada", "wrong").unwrap(), None);
        assert_eq!(db.authenticate("nobody", "pw").unwrap(), None);
    }

    #[rstest]
    fn assignment_rules(db: Database) {
        let ada = db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let project = new_project(&db, "2030-01-01");

        db.assign_user(ada.id, project.id).unwrap();
        assert!(matches!(
            db.assign_user(ada.id, project.id),
            Err(DatabaseError::AlreadyAssigned { .. })
        ));
        assert!(matches!(
            db.assign_user(99, project.id),
            Err(DatabaseError::NotFound { entity: "user", .. })
        ));
        assert_eq!(db.projects_for_user(ada.id).unwrap(), vec![project]);
    }

    #[rstest]
    fn user_tasks_span_their_projects(db: Database) {
        let ada = db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let mine = new_project(&db, "2030-01-01");
        let other = new_project(&db, "2030-01-01");
        db.assign_user(ada.id, mine.id).unwrap();
        db.insert_task(&task_in(mine.id, "mine", 1)).unwrap();
        db.insert_task(&task_in(other.id, "not mine", 1)).unwrap();

        let tasks = db.tasks_for_user(ada.id).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "mine");
    }

    #[rstest]
    fn deleting_a_user_reclaims_orphaned_projects(db: Database) {
        let ada = db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let bob = db.insert_user(&new_user("bob", "bob@example.com")).unwrap();
        let shared = new_project(&db, "2030-01-01");
        let solo = new_project(&db, "2030-01-01");
        let unassigned = new_project(&db, "2030-01-01");
        db.assign_user(ada.id, shared.id).unwrap();
        db.assign_user(bob.id, shared.id).unwrap();
        db.assign_user(ada.id, solo.id).unwrap();

        assert!(db.delete_user(ada.id).unwrap());
        assert!(db.get_project(shared.id).unwrap().is_some());
        assert!(db.get_project(solo.id).unwrap().is_none());
        assert!(db.get_project(unassigned.id).unwrap().is_some());
        assert!(!db.delete_user(ada.id).unwrap());
    }

    #[rstest]
    fn project_patch_and_default_date(db: Database) {
        let project = new_project(&db, "2030-01-01");
        assert_eq!(project.date, Some(get_current_date_string()));

        let patch = ProjectPatch {
            completion_status: Some(true),
            ..ProjectPatch::default()
        };
        let updated = db.update_project(project.id, &patch).unwrap().unwrap();
        assert!(updated.completion_status);
        assert_eq!(updated.deadline, "2030-01-01");
        assert!(db.update_project(42, &patch).unwrap().is_none());
    }

    #[rstest]
    fn load_project_restores_board(db: Database) {
        let ada = db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let project = new_project(&db, "2030-01-01");
        db.assign_user(ada.id, project.id).unwrap();
        let a = db.insert_task(&task_in(project.id, "a", 1)).unwrap();
        let b = db.insert_task(&task_in(project.id, "b", 2)).unwrap();
        db.transition_task(b.id, "Done").unwrap();

        let loaded = db.load_project(project.id).unwrap().unwrap();
        assert_eq!(loaded.users().collect::<Vec<_>>(), vec![ada.id]);
        let backlog = loaded.tasks().filter_by_category("Backlog");
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, a.id);
        assert_eq!(backlog[0].priority, "High");
        assert_eq!(loaded.tasks().filter_by_category("Done")[0].id, b.id);
        assert!(db.load_project(999).unwrap().is_none());
    }

    #[rstest]
    fn transitions_append_across_reloads(db: Database) {
        let project = new_project(&db, "2030-01-01");
        let a = db.insert_task(&task_in(project.id, "a", 1)).unwrap();
        let b = db.insert_task(&task_in(project.id, "b", 1)).unwrap();
        db.transition_task(a.id, "Doing").unwrap();
        db.transition_task(b.id, "Doing").unwrap();
        // re-entering the same category moves a to the end
        db.transition_task(a.id, "Doing").unwrap();

        let loaded = db.load_project(project.id).unwrap().unwrap();
        let doing: Vec<i64> = loaded
            .tasks()
            .tasks_in(Category::Doing)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(doing, vec![b.id, a.id]);
    }

    #[rstest]
    fn load_workspace_links_users_and_projects(db: Database) {
        let ada = db.insert_user(&new_user("ada", "ada@example.com")).unwrap();
        let project = new_project(&db, "2030-01-01");
        db.assign_user(ada.id, project.id).unwrap();

        let workspace = db.load_workspace().unwrap();
        let projects = workspace.projects_of(ada.id).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id(), project.id);
        assert!(workspace.user(ada.id).unwrap().verify_password("pw"));
    }

    #[test]
    fn new_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taskmaster.db");
        let db = Database::new(&path).unwrap();
        db.insert_task(&NewTask::new("persisted")).unwrap();
        drop(db);

        let reopened = Database::new(&path).unwrap();
        assert_eq!(reopened.list_tasks(&TaskFilter::default()).unwrap().len(), 1);
    }
}
