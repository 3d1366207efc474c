use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{ApiErrorResponse, AppState};
use crate::models::{Category, NewTask, TaskFilter, TaskPatch, TaskRecord};

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub project_id: Option<i64>,
    pub priority: Option<i64>,
}

impl TaskQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiErrorResponse> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(text) => Some(text.parse::<Category>()?),
        };
        Ok(TaskFilter {
            status,
            project_id: self.project_id,
            priority: self.priority,
        })
    }
}

/// Body of `PUT /tasks/{id}`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<String>,
    pub project_id: Option<i64>,
}

impl UpdateTaskRequest {
    fn into_patch(self) -> Result<TaskPatch, ApiErrorResponse> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?;
        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            status,
            project_id: self.project_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    pub status: String,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Json<Vec<TaskRecord>>, ApiErrorResponse> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let tasks = state.with_db(|db| db.list_tasks(&filter))?;
    Ok(Json(tasks))
}

/// New tasks always start in the Backlog.
pub async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskRecord>), ApiErrorResponse> {
    let Json(task) = body?;
    let created = state.with_db(|db| db.insert_task(&task))?;
    info!(task_id = created.id, "Task created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TaskRecord>, ApiErrorResponse> {
    state
        .with_db(|db| db.get_task(id))?
        .map(Json)
        .ok_or_else(|| ApiErrorResponse::not_found(format!("Task {id} not found")))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskRecord>, ApiErrorResponse> {
    let Json(request) = body?;
    let patch = request.into_patch()?;
    if patch.is_empty() {
        return Err(ApiErrorResponse::bad_request(
            "EMPTY_PATCH",
            "No fields to update",
        ));
    }
    state
        .with_db(|db| db.update_task(id, &patch))?
        .map(Json)
        .ok_or_else(|| ApiErrorResponse::not_found(format!("Task {id} not found")))
}

/// Category transition. Unknown categories are rejected without a write.
pub async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<MoveTaskRequest>, JsonRejection>,
) -> Result<Json<TaskRecord>, ApiErrorResponse> {
    let Json(request) = body?;
    let moved = state.with_db(|db| db.transition_task(id, &request.status))?;
    Ok(Json(moved))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiErrorResponse> {
    if state.with_db(|db| db.delete_task(id))? {
        info!(task_id = id, "Task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiErrorResponse::not_found(format!("Task {id} not found")))
    }
}

pub async fn delete_all_tasks(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiErrorResponse> {
    let deleted = state.with_db(|db| db.delete_all_tasks())?;
    info!(deleted, "Deleted all tasks");
    Ok(Json(json!({ "deleted": deleted })))
}
