pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod tasks;
pub mod tutoring;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;

/// Builds the complete application router: API routes, middleware and Swagger UI.
pub fn router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origins = state
        .config
        .cors_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                ConfigError::InvalidValue("CORS_ORIGINS".to_string(), format!("{}: {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/", get(rest::root_handler))
        .route("/jwt", post(auth::issue_token_handler))
        .route("/logout", post(auth::logout_handler))
        .route("/users/{email}", post(rest::upsert_user_handler))
        .route(
            "/tasks",
            get(tasks::list_tasks_handler).post(tasks::create_task_handler),
        )
        .route("/tasks/reorder", put(tasks::reorder_tasks_handler))
        .route(
            "/tasks/{id}",
            put(tasks::edit_task_handler).delete(tasks::delete_task_handler),
        )
        .route("/tasks/{id}/category", patch(tasks::move_task_handler))
        .route(
            "/tasks/category/{category}",
            put(tasks::move_category_handler),
        )
        .route("/tutorials", get(tutoring::list_tutorials_handler))
        .route("/tutorials/{id}", get(tutoring::get_tutorial_handler))
        .route(
            "/update-review/{tutor_id}",
            patch(tutoring::update_review_handler),
        );

    // Protected routes (valid session cookie required)
    let protected_routes = Router::new()
        .route("/tutorials", post(tutoring::create_tutorial_handler))
        .route(
            "/tutorials/{id}",
            put(tutoring::update_tutorial_handler).delete(tutoring::delete_tutorial_handler),
        )
        .route("/my-tutorials/{email}", get(tutoring::my_tutorials_handler))
        .route("/booked-tutor", post(tutoring::book_tutorial_handler))
        .route(
            "/booked-tutorial/{email}",
            get(tutoring::booked_tutorials_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let request_timeout = state.config.request_timeout;
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
