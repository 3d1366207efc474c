//! Projects, users and the arena that owns both.
//!
//! Users and projects only ever refer to each other by id. The [`Workspace`]
//! owns every value and reclaims a project once its last member leaves.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::models::{Category, Task};
use crate::password;
use crate::store::{StoreError, TaskStore};
use crate::utils::get_current_date_string;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("User {0} not found")]
    UnknownUser(i64),
    #[error("Project {0} not found")]
    UnknownProject(i64),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct Project {
    id: i64,
    date: String,
    deadline: String,
    complete: bool,
    tasks: TaskStore,
    members: BTreeSet<i64>,
}

impl Project {
    /// New, incomplete project created today
    pub fn new(id: i64, deadline: impl Into<String>) -> Self {
        Self::with_date(id, get_current_date_string(), deadline)
    }

    /// Project with an explicit creation date, as loaded from storage
    pub fn with_date(id: i64, date: impl Into<String>, deadline: impl Into<String>) -> Self {
        Self {
            id,
            date: date.into(),
            deadline: deadline.into(),
            complete: false,
            tasks: TaskStore::new(),
            members: BTreeSet::new(),
        }
    }

    /// Add a Backlog task dated today with Medium priority; returns its id
    pub fn add_task(&mut self, name: impl Into<String>) -> Result<i64, StoreError> {
        let id = self.tasks.next_id()?;
        let task = Task::new(id, name, get_current_date_string(), Category::Backlog, "Medium");
        self.tasks.create_task(task)?;
        Ok(id)
    }

    pub fn add_user(&mut self, user_id: i64) {
        self.members.insert(user_id);
    }

    pub fn remove_user(&mut self, user_id: i64) -> bool {
        self.members.remove(&user_id)
    }

    pub fn change_deadline(&mut self, deadline: impl Into<String>) {
        self.deadline = deadline.into();
    }

    pub fn mark_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn deadline(&self) -> &str {
        &self.deadline
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn users(&self) -> impl Iterator<Item = i64> + '_ {
        self.members.iter().copied()
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskStore {
        &mut self.tasks
    }
}

/// Two projects compare equal when deadline and creation date match.
/// Id, tasks and members are ignored.
impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.date == other.date
    }
}

#[derive(Debug, Clone)]
pub struct User {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    projects: BTreeSet<i64>,
}

impl User {
    /// Create a user, hashing the given plaintext password
    pub fn new(
        id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        password: &str,
    ) -> Self {
        Self::with_hash(id, name, email, password::hash_password(password))
    }

    /// Create a user from an already hashed password
    pub fn with_hash(
        id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            projects: BTreeSet::new(),
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        password::verify_password(password, &self.password_hash)
    }

    pub fn add_project(&mut self, project_id: i64) {
        self.projects.insert(project_id);
    }

    /// Does nothing if the user is not on the project
    pub fn remove_project(&mut self, project_id: i64) -> bool {
        self.projects.remove(&project_id)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn projects(&self) -> impl Iterator<Item = i64> + '_ {
        self.projects.iter().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    users: BTreeMap<i64, User>,
    projects: BTreeMap<i64, Project>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id(), user);
    }

    pub fn insert_project(&mut self, project: Project) {
        self.projects.insert(project.id(), project);
    }

    pub fn user(&self, id: i64) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn project(&self, id: i64) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn project_mut(&mut self, id: i64) -> Option<&mut Project> {
        self.projects.get_mut(&id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Put a user on a project, updating both sides
    pub fn assign(&mut self, user_id: i64, project_id: i64) -> Result<(), WorkspaceError> {
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or(WorkspaceError::UnknownProject(project_id))?;
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(WorkspaceError::UnknownUser(user_id))?;
        project.add_user(user_id);
        user.add_project(project_id);
        Ok(())
    }

    /// Take a user off a project. Returns true when the user was the last
    /// member and the project was dropped from the workspace.
    pub fn unassign(&mut self, user_id: i64, project_id: i64) -> Result<bool, WorkspaceError> {
        if !self.users.contains_key(&user_id) {
            return Err(WorkspaceError::UnknownUser(user_id));
        }
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or(WorkspaceError::UnknownProject(project_id))?;

        let was_member = project.remove_user(user_id);
        let orphaned = was_member && project.members.is_empty();
        if let Some(user) = self.users.get_mut(&user_id) {
            user.remove_project(project_id);
        }
        if orphaned {
            self.projects.remove(&project_id);
        }
        Ok(orphaned)
    }

    /// Remove a user and every project only they were on.
    /// Returns the ids of reclaimed projects.
    pub fn remove_user(&mut self, user_id: i64) -> Result<Vec<i64>, WorkspaceError> {
        let project_ids: Vec<i64> = self
            .users
            .get(&user_id)
            .ok_or(WorkspaceError::UnknownUser(user_id))?
            .projects()
            .collect();

        let mut reclaimed = Vec::new();
        for project_id in project_ids {
            // a dangling id means the project is already gone
            match self.unassign(user_id, project_id) {
                Ok(true) => reclaimed.push(project_id),
                Ok(false) | Err(WorkspaceError::UnknownProject(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.users.remove(&user_id);
        Ok(reclaimed)
    }

    pub fn projects_of(&self, user_id: i64) -> Result<Vec<&Project>, WorkspaceError> {
        let user = self.user(user_id).ok_or(WorkspaceError::UnknownUser(user_id))?;
        Ok(user.projects().filter_map(|id| self.projects.get(&id)).collect())
    }

    pub fn members_of(&self, project_id: i64) -> Result<Vec<&User>, WorkspaceError> {
        let project = self
            .project(project_id)
            .ok_or(WorkspaceError::UnknownProject(project_id))?;
        Ok(project.users().filter_map(|id| self.users.get(&id)).collect())
    }
}
