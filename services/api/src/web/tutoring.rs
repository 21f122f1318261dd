//! services/api/src/web/tutoring.rs
//!
//! REST handlers for tutoring listings and bookings.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use taskboard_core::domain::{DocumentId, NewBooking, NewTutorial, SessionIdentity};
use tracing::info;

use crate::error::{ApiError, ErrorBody};
use crate::web::{rest::MessageResponse, state::AppState};

#[derive(Deserialize)]
pub struct TutorialQuery {
    pub category: Option<String>,
}

//=========================================================================================
// Listings
//=========================================================================================

/// POST /tutorials - Publish a listing (session required)
#[utoipa::path(
    post,
    path = "/tutorials",
    request_body = Object,
    responses(
        (status = 201, description = "Listing inserted; the store's insertion result"),
        (status = 400, description = "Malformed body, missing owner email or category", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn create_tutorial_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<SessionIdentity>,
    payload: Result<Json<NewTutorial>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(listing) = payload?;
    info!(
        by = identity.email().unwrap_or("<none>"),
        owner = %listing.owner_email,
        "Publishing tutorial"
    );
    let outcome = state.tutoring.publish(listing).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /tutorials - All listings, optionally of one category
#[utoipa::path(
    get,
    path = "/tutorials",
    params(("category" = Option<String>, Query, description = "Only listings of this category.")),
    responses((status = 200, description = "Listings"))
)]
pub async fn list_tutorials_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TutorialQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.tutoring.list(query.category.as_deref()).await?))
}

/// GET /tutorials/{id} - One listing
#[utoipa::path(
    get,
    path = "/tutorials/{id}",
    params(("id" = String, Path, description = "Tutorial identifier.")),
    responses(
        (status = 200, description = "The listing"),
        (status = 400, description = "Malformed identifier", body = ErrorBody),
        (status = 404, description = "No such listing", body = ErrorBody)
    )
)]
pub async fn get_tutorial_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = DocumentId::parse(&id)?;
    Ok(Json(state.tutoring.get(id).await?))
}

/// GET /my-tutorials/{email} - Listings owned by an email (session required)
#[utoipa::path(
    get,
    path = "/my-tutorials/{email}",
    params(("email" = String, Path, description = "Owner email.")),
    responses(
        (status = 200, description = "Listings of this owner"),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn my_tutorials_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.tutoring.listings_of(&email).await?))
}

/// PUT /tutorials/{id} - Revise a listing (session required)
#[utoipa::path(
    put,
    path = "/tutorials/{id}",
    params(("id" = String, Path, description = "Tutorial identifier.")),
    request_body = Object,
    responses(
        (status = 200, description = "The store's update result"),
        (status = 400, description = "Malformed identifier, invalid owner email or category, or nothing to update", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "No such listing", body = ErrorBody)
    )
)]
pub async fn update_tutorial_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(fields) = payload?;
    let id = DocumentId::parse(&id)?;
    Ok(Json(state.tutoring.revise(id, fields).await?))
}

/// DELETE /tutorials/{id} - Withdraw a listing (session required)
#[utoipa::path(
    delete,
    path = "/tutorials/{id}",
    params(("id" = String, Path, description = "Tutorial identifier.")),
    responses(
        (status = 200, description = "Listing deleted", body = MessageResponse),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "No such listing", body = ErrorBody)
    )
)]
pub async fn delete_tutorial_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = DocumentId::parse(&id)?;
    state.tutoring.withdraw(id).await?;
    Ok(Json(MessageResponse {
        message: "Tutorial deleted successfully".to_string(),
    }))
}

/// PATCH /update-review/{tutor_id} - Count one more review
#[utoipa::path(
    patch,
    path = "/update-review/{tutor_id}",
    params(("tutor_id" = String, Path, description = "Tutorial identifier.")),
    responses(
        (status = 200, description = "The review count after the increment"),
        (status = 400, description = "Malformed identifier", body = ErrorBody),
        (status = 404, description = "No such listing", body = ErrorBody)
    )
)]
pub async fn update_review_handler(
    State(state): State<Arc<AppState>>,
    Path(tutor_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = DocumentId::parse(&tutor_id)?;
    Ok(Json(state.tutoring.record_review(id).await?))
}

//=========================================================================================
// Bookings
//=========================================================================================

/// POST /booked-tutor - Book a tutorial (session required)
#[utoipa::path(
    post,
    path = "/booked-tutor",
    request_body = Object,
    responses(
        (status = 201, description = "Booking inserted; the store's insertion result"),
        (status = 400, description = "Malformed tutorial reference", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 404, description = "Referenced tutorial does not exist", body = ErrorBody)
    )
)]
pub async fn book_tutorial_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(booking) = payload?;
    let outcome = state.tutoring.book(booking).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /booked-tutorial/{email} - Bookings made by an email (session required)
#[utoipa::path(
    get,
    path = "/booked-tutorial/{email}",
    params(("email" = String, Path, description = "Student email.")),
    responses(
        (status = 200, description = "Bookings of this student"),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn booked_tutorials_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.tutoring.bookings_of(&email).await?))
}
