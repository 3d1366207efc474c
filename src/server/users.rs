use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ApiErrorResponse, AppState};
use crate::database::{Database, DatabaseError};
use crate::models::{NewUser, ProjectRecord, TaskRecord, UserRecord};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address or user name
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: i64,
    pub project_id: i64,
}

fn require_user(db: &Database, id: i64) -> Result<(), DatabaseError> {
    match db.get_user(id)? {
        Some(_) => Ok(()),
        None => Err(DatabaseError::NotFound { entity: "user", id }),
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiErrorResponse> {
    let Json(user) = body?;
    let created = state.with_db(|db| db.insert_user(&user))?;
    info!(user_id = created.id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>, ApiErrorResponse> {
    Ok(Json(state.with_db(|db| db.list_users())?))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserRecord>, ApiErrorResponse> {
    state
        .with_db(|db| db.get_user_by_email(&email))?
        .map(Json)
        .ok_or_else(|| ApiErrorResponse::not_found(format!("No user with email '{email}'")))
}

/// Projects left without members are deleted along with the user.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiErrorResponse> {
    if state.with_db(|db| db.delete_user(id))? {
        info!(user_id = id, "User deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiErrorResponse::not_found(format!("User {id} not found")))
    }
}

pub async fn user_projects(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProjectRecord>>, ApiErrorResponse> {
    let projects = state.with_db(|db| {
        require_user(db, id)?;
        db.projects_for_user(id)
    })?;
    Ok(Json(projects))
}

pub async fn user_tasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TaskRecord>>, ApiErrorResponse> {
    let tasks = state.with_db(|db| {
        require_user(db, id)?;
        db.tasks_for_user(id)
    })?;
    Ok(Json(tasks))
}

pub async fn assign_user(
    State(state): State<AppState>,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiErrorResponse> {
    let Json(request) = body?;
    state.with_db(|db| db.assign_user(request.user_id, request.project_id))?;
    info!(
        user_id = request.user_id,
        project_id = request.project_id,
        "User assigned to project"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User assigned to project" })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserRecord>, ApiErrorResponse> {
    let Json(request) = body?;
    match state.with_db(|db| db.authenticate(&request.login, &request.password))? {
        Some(user) => {
            info!(user_id = user.id, "Login succeeded");
            Ok(Json(user))
        }
        None => {
            warn!(login = %request.login, "Login failed");
            Err(ApiErrorResponse::unauthorized("Invalid login or password"))
        }
    }
}
