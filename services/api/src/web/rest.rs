//! services/api/src/web/rest.rs
//!
//! Contains the read-side Axum handlers (dashboards and progress) and the
//! master definition for the OpenAPI specification.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use portal_core::access::ensure_teaches;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{ApiError, ErrorBody};
use crate::web::middleware::CurrentUser;
use crate::web::protocol::*;
use crate::web::state::AppState;
use crate::web::{student, teacher};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        dashboard_handler,
        course_progress_handler,
        student::validate_competency_handler,
        student::unvalidate_competency_handler,
        student::toggle_competency_handler,
        student::assignment_status_handler,
        student::submit_assignment_handler,
        teacher::create_course_handler,
        teacher::add_material_handler,
        teacher::update_material_handler,
        teacher::delete_material_handler,
        teacher::add_competency_handler,
        teacher::update_competency_handler,
        teacher::delete_competency_handler,
        teacher::create_assignment_handler,
        teacher::update_assignment_handler,
        teacher::evaluate_submission_handler,
        teacher::pending_evaluations_handler,
        teacher::enroll_students_handler,
        teacher::unenroll_student_handler,
    ),
    components(
        schemas(
            ErrorBody,
            DashboardDto,
            StudentDashboardDto,
            TeacherDashboardDto,
            AdminDashboardDto,
            ProgressDto,
            StatusDto,
            SubmissionDto,
            CourseDto,
            MaterialDto,
            CompetencyDto,
            AssignmentDto,
            EnrollmentResultDto,
        )
    ),
    tags(
        (name = "Education Portal API", description = "Progress, status and evaluation endpoints for students and teachers."),
        (name = "student", description = "Operations on the caller's own records."),
        (name = "teacher", description = "Courses, course content, enrollments and grading.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Dashboard of the calling user, shaped by their role.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Role-specific dashboard", body = DashboardDto),
        (status = 401, description = "Missing or unknown identity", body = ErrorBody)
    ),
    params(
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    )
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<DashboardDto>, ApiError> {
    let dashboard = state.dashboards.for_user(&user.id).await?;
    Ok(Json(dashboard.into()))
}

/// Completion percentage of a course for a student.
///
/// Without `student_id` the caller's own progress is returned. Asking for
/// another student requires teaching the course.
#[utoipa::path(
    get,
    path = "/courses/{id}/progress",
    params(
        ("id" = i64, Path, description = "Course id."),
        ProgressQuery,
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Progress for the student", body = ProgressDto),
        (status = 403, description = "Not enrolled, or not a teacher of the course", body = ErrorBody)
    )
)]
pub async fn course_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<i64>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressDto>, ApiError> {
    let student_id = match query.student_id {
        Some(student_id) if student_id != user.id => {
            ensure_teaches(state.store.as_ref(), &user.id, course_id).await?;
            student_id
        }
        _ => user.id,
    };
    let progress = state
        .dashboards
        .student_progress(&student_id, course_id)
        .await?;
    Ok(Json(progress.into()))
}
