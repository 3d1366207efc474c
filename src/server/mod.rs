//! HTTP API over the task database.

pub mod error;
pub mod projects;
pub mod tasks;
pub mod users;

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::routing::{delete, get, post};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::database::{Database, DatabaseError};
pub use error::{ApiError, ApiErrorResponse};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Shared handler state.
///
/// The database sits behind one mutex, so requests touch it one at a time.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` with exclusive access to the database
    pub fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, DatabaseError>,
    ) -> Result<T, ApiErrorResponse> {
        let db = self.db.lock().map_err(|_| {
            error!("Database mutex poisoned");
            ApiErrorResponse::internal_error("An internal error occurred")
        })?;
        f(&db).map_err(ApiErrorResponse::from)
    }
}

/// Build the application router
pub fn build_router(state: AppState, debug_routes: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        // Tasks
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/{id}/status", post(tasks::move_task))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/email/{email}", get(users::get_user_by_email))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/projects", get(users::user_projects))
        .route("/users/{id}/tasks", get(users::user_tasks))
        .route("/user_projects", post(users::assign_user))
        .route("/auth/login", post(users::login))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/board", get(projects::board))
        .route("/projects/{id}/tasks", get(projects::project_tasks));

    if debug_routes {
        warn!("Debug routes enabled");
        router = router
            .route("/debug/tasks", delete(tasks::delete_all_tasks))
            .route("/debug/projects", delete(projects::delete_all_projects));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> &'static str {
    "Server is running!"
}

async fn health_check() -> axum::Json<Value> {
    axum::Json(json!({ "status": "healthy" }))
}

/// Serve the API on `address` until Ctrl+C or SIGTERM.
/// Blocks the calling thread on a fresh tokio runtime.
pub fn run(address: &str, db: Database, debug_routes: bool) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;
    runtime.block_on(serve(address, db, debug_routes))
}

pub async fn serve(address: &str, db: Database, debug_routes: bool) -> Result<(), ServerError> {
    let application = build_router(AppState::new(db), debug_routes);

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })?;

    match listener.local_addr() {
        Ok(local) => info!("Listening on {}", local),
        Err(error) => warn!(%error, "Could not determine local address"),
    }

    axum::serve(listener, application)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shutdown complete");
    Ok(())
}

/// Completes on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
