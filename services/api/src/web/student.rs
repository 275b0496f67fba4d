//! services/api/src/web/student.rs
//!
//! Handlers a student calls on their own records: competency self-validation,
//! assignment status and submissions. The caller is always the subject; there
//! is no way to act for another student.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::error::{ApiError, ErrorBody};
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{StatusDto, SubmissionDto, SubmitRequest, ValidationDto};
use crate::web::state::AppState;

/// Validate a competency for the calling student.
///
/// Validating an already validated competency succeeds without change.
#[utoipa::path(
    post,
    path = "/competencies/{id}/validation",
    tag = "student",
    params(
        ("id" = i64, Path, description = "Competency id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Competency is validated", body = ValidationDto),
        (status = 403, description = "Not enrolled in the competency's course", body = ErrorBody),
        (status = 404, description = "Unknown competency", body = ErrorBody)
    )
)]
pub async fn validate_competency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(competency_id): Path<i64>,
) -> Result<Json<ValidationDto>, ApiError> {
    state.competencies.validate(&user.id, competency_id).await?;
    Ok(Json(ValidationDto {
        competency_id,
        validated: true,
    }))
}

/// Withdraw the calling student's validation of a competency.
#[utoipa::path(
    delete,
    path = "/competencies/{id}/validation",
    tag = "student",
    params(
        ("id" = i64, Path, description = "Competency id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Competency is no longer validated", body = ValidationDto),
        (status = 403, description = "Not enrolled in the competency's course", body = ErrorBody),
        (status = 404, description = "Unknown competency", body = ErrorBody)
    )
)]
pub async fn unvalidate_competency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(competency_id): Path<i64>,
) -> Result<Json<ValidationDto>, ApiError> {
    state.competencies.unvalidate(&user.id, competency_id).await?;
    Ok(Json(ValidationDto {
        competency_id,
        validated: false,
    }))
}

/// Lifecycle status of an assignment for the calling student.
#[utoipa::path(
    get,
    path = "/assignments/{id}/status",
    tag = "student",
    params(
        ("id" = i64, Path, description = "Assignment id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Resolved status", body = StatusDto),
        (status = 403, description = "Not enrolled in the assignment's course", body = ErrorBody),
        (status = 404, description = "Unknown assignment", body = ErrorBody)
    )
)]
pub async fn assignment_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(assignment_id): Path<i64>,
) -> Result<Json<StatusDto>, ApiError> {
    let resolution = state.submissions.status(&user.id, assignment_id).await?;
    Ok(Json(resolution.into()))
}

/// Submit a new attempt at an assignment.
#[utoipa::path(
    post,
    path = "/assignments/{id}/submissions",
    tag = "student",
    request_body = SubmitRequest,
    params(
        ("id" = i64, Path, description = "Assignment id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 201, description = "Attempt recorded", body = SubmissionDto),
        (status = 400, description = "Empty content", body = ErrorBody),
        (status = 403, description = "Not enrolled in the assignment's course", body = ErrorBody),
        (status = 409, description = "Attempt limit reached", body = ErrorBody)
    )
)]
pub async fn submit_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(assignment_id): Path<i64>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmissionDto>), ApiError> {
    let submission = state
        .submissions
        .submit(&user.id, assignment_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(submission.into())))
}

/// Flip the calling student's validation of a competency.
#[utoipa::path(
    post,
    path = "/competencies/{id}/validation/toggle",
    tag = "student",
    params(
        ("id" = i64, Path, description = "Competency id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "New validation state", body = ValidationDto),
        (status = 403, description = "Not enrolled in the competency's course", body = ErrorBody),
        (status = 404, description = "Unknown competency", body = ErrorBody)
    )
)]
pub async fn toggle_competency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(competency_id): Path<i64>,
) -> Result<Json<ValidationDto>, ApiError> {
    let validated = state.competencies.toggle(&user.id, competency_id).await?;
    Ok(Json(ValidationDto {
        competency_id,
        validated,
    }))
}
