use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::{ApiErrorResponse, AppState};
use crate::models::{Category, NewProject, ProjectPatch, ProjectRecord, Task};
use crate::workspace::Project;

/// A project's task board, one column per category in board order
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardResponse {
    pub project_id: i64,
    pub deadline: String,
    pub complete: bool,
    pub columns: BTreeMap<Category, Vec<Task>>,
}

impl From<&Project> for BoardResponse {
    fn from(project: &Project) -> Self {
        let columns = Category::ALL
            .into_iter()
            .map(|category| (category, project.tasks().tasks_in(category)))
            .collect();
        Self {
            project_id: project.id(),
            deadline: project.deadline().to_string(),
            complete: project.is_complete(),
            columns,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PriorityQuery {
    pub priority: Option<String>,
}

fn missing(id: i64) -> ApiErrorResponse {
    ApiErrorResponse::not_found(format!("Project {id} not found"))
}

pub async fn create_project(
    State(state): State<AppState>,
    body: Result<Json<NewProject>, JsonRejection>,
) -> Result<(StatusCode, Json<ProjectRecord>), ApiErrorResponse> {
    let Json(project) = body?;
    let created = state.with_db(|db| db.insert_project(&project))?;
    info!(project_id = created.id, "Project created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectRecord>>, ApiErrorResponse> {
    Ok(Json(state.with_db(|db| db.list_projects())?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProjectRecord>, ApiErrorResponse> {
    state
        .with_db(|db| db.get_project(id))?
        .map(Json)
        .ok_or_else(|| missing(id))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<ProjectPatch>, JsonRejection>,
) -> Result<Json<ProjectRecord>, ApiErrorResponse> {
    let Json(patch) = body?;
    if patch.is_empty() {
        return Err(ApiErrorResponse::bad_request(
            "EMPTY_PATCH",
            "No fields to update",
        ));
    }
    state
        .with_db(|db| db.update_project(id, &patch))?
        .map(Json)
        .ok_or_else(|| missing(id))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiErrorResponse> {
    if state.with_db(|db| db.delete_project(id))? {
        info!(project_id = id, "Project deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(missing(id))
    }
}

pub async fn board(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BoardResponse>, ApiErrorResponse> {
    let project = state.with_db(|db| db.load_project(id))?.ok_or_else(|| missing(id))?;
    Ok(Json(BoardResponse::from(&project)))
}

/// Tasks of a project in board order, optionally only those with the given
/// priority label.
pub async fn project_tasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    query: Result<Query<PriorityQuery>, QueryRejection>,
) -> Result<Json<Vec<Task>>, ApiErrorResponse> {
    let Query(query) = query?;
    let project = state.with_db(|db| db.load_project(id))?.ok_or_else(|| missing(id))?;
    let store = project.tasks();
    let tasks = match query.priority.as_deref() {
        Some(priority) => store.filter_by_priority(priority),
        None => Category::ALL
            .into_iter()
            .flat_map(|category| store.tasks_in(category))
            .collect(),
    };
    Ok(Json(tasks))
}

pub async fn delete_all_projects(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiErrorResponse> {
    let deleted = state.with_db(|db| db.delete_all_projects())?;
    info!(deleted, "Deleted all projects");
    Ok(Json(json!({ "deleted": deleted })))
}
