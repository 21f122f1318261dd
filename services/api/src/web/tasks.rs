//! services/api/src/web/tasks.rs
//!
//! REST handlers for the task board.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use taskboard_core::domain::{DocumentId, NewTask, TaskEdit};
use taskboard_core::ports::PortError;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::{rest::MessageResponse, state::AppState};

//=========================================================================================
// Request Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to "To-Do".
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct EditTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct MoveTaskRequest {
    pub category: String,
}

/// One task of a reordered board. Only its identifier is read; the rest of
/// the task the client echoes back is ignored.
#[derive(Deserialize, ToSchema)]
pub struct ReorderEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
}

/// The whole board, in the order the client wants it.
#[derive(Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub tasks: Vec<ReorderEntry>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /tasks - All tasks, ascending by `order`
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Tasks sorted by order"),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.tasks.list().await?))
}

/// POST /tasks - Create a task at the end of the board
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task inserted; the store's insertion result"),
        (status = 400, description = "Missing title", body = ErrorBody)
    )
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let outcome = state
        .tasks
        .create(NewTask {
            title: req.title,
            description: req.description,
            category: req.category,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PUT /tasks/{id} - Edit a task's title, description or category
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier.")),
    request_body = EditTaskRequest,
    responses(
        (status = 200, description = "The store's update result"),
        (status = 400, description = "Malformed identifier or empty edit", body = ErrorBody),
        (status = 404, description = "No such task", body = ErrorBody)
    )
)]
pub async fn edit_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<EditTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let id = DocumentId::parse(&id)?;
    let edit = TaskEdit {
        title: req.title,
        description: req.description,
        category: req.category,
    };
    Ok(Json(state.tasks.edit(id, edit).await?))
}

/// PATCH /tasks/{id}/category - Move a task to another category
#[utoipa::path(
    patch,
    path = "/tasks/{id}/category",
    params(("id" = String, Path, description = "Task identifier.")),
    request_body = MoveTaskRequest,
    responses(
        (status = 200, description = "The store's update result"),
        (status = 400, description = "Malformed identifier or blank category", body = ErrorBody),
        (status = 404, description = "No such task", body = ErrorBody)
    )
)]
pub async fn move_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MoveTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let id = DocumentId::parse(&id)?;
    Ok(Json(state.tasks.move_to(id, &req.category).await?))
}

/// PUT /tasks/category/{category} - Move every task of a category into another
#[utoipa::path(
    put,
    path = "/tasks/category/{category}",
    params(("category" = String, Path, description = "Category to empty.")),
    request_body = MoveTaskRequest,
    responses(
        (status = 200, description = "The store's bulk update result"),
        (status = 400, description = "Blank category", body = ErrorBody)
    )
)]
pub async fn move_category_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    payload: Result<Json<MoveTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    Ok(Json(
        state.tasks.move_category(&category, &req.category).await?,
    ))
}

/// PUT /tasks/reorder - Persist a new arrangement of the whole board.
///
/// Responds 200 when every task got its new position and 207 when some did
/// not; the body lists the outcome per task either way.
#[utoipa::path(
    put,
    path = "/tasks/reorder",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Every task repositioned"),
        (status = 207, description = "Some tasks could not be repositioned"),
        (status = 400, description = "Not a permutation of the current board", body = ErrorBody)
    )
)]
pub async fn reorder_tasks_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) =
        payload.map_err(|rejection| PortError::InvalidReorderPayload(rejection.body_text()))?;
    let submitted = req
        .tasks
        .iter()
        .map(|entry| DocumentId::parse(&entry.id))
        .collect::<Result<Vec<_>, _>>()?;

    let report = state.tasks.reorder(&submitted).await?;
    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        warn!("Reorder applied partially");
        StatusCode::MULTI_STATUS
    };
    Ok((status, Json(report)))
}

/// DELETE /tasks/{id} - Delete a task
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier.")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 400, description = "Malformed identifier", body = ErrorBody),
        (status = 404, description = "No such task", body = ErrorBody)
    )
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = DocumentId::parse(&id)?;
    state.tasks.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
