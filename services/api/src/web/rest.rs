//! services/api/src/web/rest.rs
//!
//! Contains the shared REST response payloads, the root and user handlers, and
//! the master definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorBody};
use crate::web::{auth, state::AppState, tasks, tutoring};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        upsert_user_handler,
        auth::issue_token_handler,
        auth::logout_handler,
        tasks::list_tasks_handler,
        tasks::create_task_handler,
        tasks::edit_task_handler,
        tasks::move_task_handler,
        tasks::move_category_handler,
        tasks::reorder_tasks_handler,
        tasks::delete_task_handler,
        tutoring::create_tutorial_handler,
        tutoring::list_tutorials_handler,
        tutoring::get_tutorial_handler,
        tutoring::my_tutorials_handler,
        tutoring::update_tutorial_handler,
        tutoring::delete_tutorial_handler,
        tutoring::update_review_handler,
        tutoring::book_tutorial_handler,
        tutoring::booked_tutorials_handler,
    ),
    components(
        schemas(
            SuccessResponse,
            MessageResponse,
            ErrorBody,
            tasks::CreateTaskRequest,
            tasks::EditTaskRequest,
            tasks::MoveTaskRequest,
            tasks::ReorderRequest,
            tasks::ReorderEntry,
        )
    ),
    tags(
        (name = "Task Board API", description = "Tasks, users and tutoring listings over a document store.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Payload Structs
//=========================================================================================

/// `{"success": true}`, returned by the session endpoints.
#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// A human-readable confirmation, returned by deletes.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET / - Liveness greeting
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Server is up", body = String))
)]
pub async fn root_handler() -> &'static str {
    "Hello from Task Management Server...."
}

/// POST /users/{email} - Register a user on first sight of an identity.
///
/// The body is the user's profile as a JSON object. If a user with this email
/// already exists it is returned unchanged (200); otherwise the profile is
/// stored under this email and the new user returned (201).
#[utoipa::path(
    post,
    path = "/users/{email}",
    params(("email" = String, Path, description = "Identity key of the user.")),
    responses(
        (status = 200, description = "User already existed and is returned unchanged"),
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid email", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn upsert_user_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(profile) = payload?;
    let outcome = state.users.upsert_by_identity(&email, profile).await?;
    let status = if outcome.was_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into_record())))
}
