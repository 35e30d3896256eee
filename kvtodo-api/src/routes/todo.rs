/// Task endpoints
///
/// All routes run behind the bearer middleware, so every request needs
/// `Authorization: Bearer <token>`; without one it is rejected with 401
/// before the handler runs. This includes `PUT /api/todo`, which older
/// clients called without a token.
///
/// A caller only ever sees its own tasks: naming another user in `userId` is
/// a 401, and a task owned by someone else is reported as missing (404).
///
/// # Endpoints
///
/// - `POST /api/todo` - Create a task
/// - `GET /api/todo/:user_id` - List a user's tasks
/// - `PUT /api/todo` - Update a task's status

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use kvtodo_shared::{
    auth::middleware::AuthContext,
    models::task::{Task, TaskStatus},
    repository::RepositoryError,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Task description
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub task: String,

    /// Owner, must be the authenticated user
    #[serde(default, rename = "userId")]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub user_id: String,
}

/// Update status request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// Task ID
    #[serde(default, rename = "todoId")]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub todo_id: String,

    /// New status (`in_progress` or `completed`)
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields"))]
    pub status: String,
}

/// Resolves the `userId` a request names, rejecting anyone but the caller
fn authorize_owner(auth: &AuthContext, user_id: &str) -> ApiResult<Uuid> {
    let owner: Uuid = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid user id: {}", user_id)))?;

    if owner != auth.user_id {
        tracing::warn!(
            caller = %auth.user_id,
            requested = %owner,
            "Rejected access to another user's tasks"
        );
        return Err(ApiError::Unauthorized(
            "Token does not belong to this user".to_string(),
        ));
    }

    Ok(owner)
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/todo
/// Authorization: Bearer <token>
///
/// { "task": "buy milk", "userId": "uuid" }
/// ```
///
/// # Response
///
/// `201 Created` with the stored task:
///
/// ```json
/// {
///   "id": "uuid",
///   "task": "buy milk",
///   "status": "new",
///   "user_id": "uuid",
///   "created_at": "2024-01-01T00:00:00Z"
/// }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(req) = payload?;
    req.validate()?;

    let owner = authorize_owner(&auth, &req.user_id)?;

    let task = Task::new(req.task, owner);
    state.tasks.create_task(&task).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List a user's tasks
///
/// Order is unspecified. An owner with no tasks gets `[]`.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let owner = authorize_owner(&auth, &user_id)?;

    let tasks = state.tasks.list_by_owner(owner).await?;

    Ok(Json(tasks))
}

/// Update a task's status
///
/// # Endpoint
///
/// ```text
/// PUT /api/todo
/// Authorization: Bearer <token>
///
/// { "todoId": "uuid", "status": "completed" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields or a status other than
///   `in_progress`/`completed`
/// - `404 Not Found`: No such task for this user
/// - `409 Conflict`: The task kept changing underneath the update
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Json(req) = payload?;
    req.validate()?;

    if TaskStatus::parse_update(&req.status).is_none() {
        return Err(ApiError::BadRequest("Invalid status value".to_string()));
    }

    let not_found = || ApiError::NotFound("Task not found".to_string());

    let existing = match state.tasks.get_task(&req.todo_id).await {
        Ok(task) => task,
        Err(RepositoryError::NotFound { .. }) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    if !existing.is_owned_by(auth.user_id) {
        return Err(not_found());
    }

    let updated = state.tasks.update_status(&req.todo_id, &req.status).await?;

    Ok(Json(updated))
}
