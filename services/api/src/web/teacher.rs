//! services/api/src/web/teacher.rs
//!
//! Handlers for teacher-side mutations. Ownership of the course is checked by
//! the core services, so a teacher of another course gets 403.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use portal_core::domain::{NewAssignment, NewCompetency, NewMaterial};
use std::sync::Arc;

use crate::error::{ApiError, ErrorBody};
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{
    AssignmentDto, AssignmentPatchRequest, CompetencyDto, CompetencyPatchRequest, CourseDto,
    EnrollRequest, EnrollmentResultDto, EvaluationRequest, MaterialDto, MaterialPatchRequest,
    NewAssignmentRequest, NewCompetencyRequest, NewCourseRequest, NewMaterialRequest,
    SubmissionDto,
};
use crate::web::state::AppState;

//=========================================================================================
// Courses & Materials
//=========================================================================================

/// Create a course taught by the caller.
#[utoipa::path(
    post,
    path = "/courses",
    tag = "teacher",
    request_body = NewCourseRequest,
    params(
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 201, description = "Course created", body = CourseDto),
        (status = 400, description = "Empty title", body = ErrorBody),
        (status = 403, description = "Students may not create courses", body = ErrorBody)
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<CourseDto>), ApiError> {
    let course = state.courses.create_course(&user.id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// Attach the metadata of an uploaded file to a course.
#[utoipa::path(
    post,
    path = "/courses/{id}/materials",
    tag = "teacher",
    request_body = NewMaterialRequest,
    params(
        ("id" = i64, Path, description = "Course id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 201, description = "Material added", body = MaterialDto),
        (status = 400, description = "Empty title or file URL", body = ErrorBody),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody)
    )
)]
pub async fn add_material_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<i64>,
    Json(req): Json<NewMaterialRequest>,
) -> Result<(StatusCode, Json<MaterialDto>), ApiError> {
    let material = state
        .courses
        .add_material(
            &user.id,
            NewMaterial {
                course_id,
                title: req.title,
                description: req.description,
                file_url: req.file_url,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(material.into())))
}

#[utoipa::path(
    patch,
    path = "/materials/{id}",
    tag = "teacher",
    request_body = MaterialPatchRequest,
    params(
        ("id" = i64, Path, description = "Material id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Material updated", body = MaterialDto),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Unknown material", body = ErrorBody)
    )
)]
pub async fn update_material_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(material_id): Path<i64>,
    Json(req): Json<MaterialPatchRequest>,
) -> Result<Json<MaterialDto>, ApiError> {
    let material = state
        .courses
        .update_material(&user.id, material_id, req.into())
        .await?;
    Ok(Json(material.into()))
}

#[utoipa::path(
    delete,
    path = "/materials/{id}",
    tag = "teacher",
    params(
        ("id" = i64, Path, description = "Material id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Unknown material", body = ErrorBody)
    )
)]
pub async fn delete_material_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(material_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.courses.delete_material(&user.id, material_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Competencies
//=========================================================================================

/// Add a competency to a course.
#[utoipa::path(
    post,
    path = "/courses/{id}/competencies",
    tag = "teacher",
    request_body = NewCompetencyRequest,
    params(
        ("id" = i64, Path, description = "Course id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 201, description = "Competency created", body = CompetencyDto),
        (status = 400, description = "Empty title", body = ErrorBody),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody)
    )
)]
pub async fn add_competency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<i64>,
    Json(req): Json<NewCompetencyRequest>,
) -> Result<(StatusCode, Json<CompetencyDto>), ApiError> {
    let competency = state
        .competencies
        .add_competency(
            &user.id,
            NewCompetency {
                course_id,
                title: req.title,
                description: req.description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(competency.into())))
}

#[utoipa::path(
    patch,
    path = "/competencies/{id}",
    tag = "teacher",
    request_body = CompetencyPatchRequest,
    params(
        ("id" = i64, Path, description = "Competency id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Competency updated", body = CompetencyDto),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Unknown competency", body = ErrorBody)
    )
)]
pub async fn update_competency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(competency_id): Path<i64>,
    Json(req): Json<CompetencyPatchRequest>,
) -> Result<Json<CompetencyDto>, ApiError> {
    let competency = state
        .competencies
        .update_competency(&user.id, competency_id, req.into())
        .await?;
    Ok(Json(competency.into()))
}

/// Delete a competency. Students' validations of it stop counting toward progress.
#[utoipa::path(
    delete,
    path = "/competencies/{id}",
    tag = "teacher",
    params(
        ("id" = i64, Path, description = "Competency id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 204, description = "Competency deleted"),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Unknown competency", body = ErrorBody)
    )
)]
pub async fn delete_competency_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(competency_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .competencies
        .delete_competency(&user.id, competency_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Assignments
//=========================================================================================

#[utoipa::path(
    post,
    path = "/courses/{id}/assignments",
    tag = "teacher",
    request_body = NewAssignmentRequest,
    params(
        ("id" = i64, Path, description = "Course id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 201, description = "Assignment created", body = AssignmentDto),
        (status = 400, description = "Invalid title, window or attempt limit", body = ErrorBody),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody)
    )
)]
pub async fn create_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<i64>,
    Json(req): Json<NewAssignmentRequest>,
) -> Result<(StatusCode, Json<AssignmentDto>), ApiError> {
    let assignment = state
        .assignments
        .create_assignment(
            &user.id,
            NewAssignment {
                course_id,
                title: req.title,
                description: req.description,
                kind: req.kind,
                start_date: req.start_date,
                end_date: req.end_date,
                max_attempts: req.max_attempts,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(assignment.into())))
}

#[utoipa::path(
    patch,
    path = "/assignments/{id}",
    tag = "teacher",
    request_body = AssignmentPatchRequest,
    params(
        ("id" = i64, Path, description = "Assignment id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Assignment updated", body = AssignmentDto),
        (status = 400, description = "Invalid title, window or attempt limit", body = ErrorBody),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Unknown assignment", body = ErrorBody)
    )
)]
pub async fn update_assignment_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(assignment_id): Path<i64>,
    Json(req): Json<AssignmentPatchRequest>,
) -> Result<Json<AssignmentDto>, ApiError> {
    let assignment = state
        .assignments
        .update_assignment(&user.id, assignment_id, req.into())
        .await?;
    Ok(Json(assignment.into()))
}

//=========================================================================================
// Evaluations
//=========================================================================================

/// Apply a grade and/or feedback to a submission.
///
/// Fields left out of the body keep their stored value. Every call stamps the
/// evaluation time.
#[utoipa::path(
    patch,
    path = "/submissions/{id}/evaluation",
    tag = "teacher",
    request_body = EvaluationRequest,
    params(
        ("id" = i64, Path, description = "Submission id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Evaluation applied", body = SubmissionDto),
        (status = 400, description = "Grade outside 0-100 or empty evaluation", body = ErrorBody),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Unknown submission", body = ErrorBody)
    )
)]
pub async fn evaluate_submission_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(submission_id): Path<i64>,
    Json(req): Json<EvaluationRequest>,
) -> Result<Json<SubmissionDto>, ApiError> {
    let submission = state
        .evaluations
        .apply_evaluation(submission_id, req.into(), &user.id)
        .await?;
    Ok(Json(submission.into()))
}

/// Ungraded submissions across the caller's courses, oldest first.
#[utoipa::path(
    get,
    path = "/evaluations/pending",
    tag = "teacher",
    params(
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Submissions awaiting a grade", body = [SubmissionDto])
    )
)]
pub async fn pending_evaluations_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<SubmissionDto>>, ApiError> {
    let pending = state.evaluations.pending_evaluations(&user.id).await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Enrollments
//=========================================================================================

/// Enroll a batch of students. Students already enrolled are reported, not rejected.
#[utoipa::path(
    post,
    path = "/courses/{id}/enrollments",
    tag = "teacher",
    request_body = EnrollRequest,
    params(
        ("id" = i64, Path, description = "Course id."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 200, description = "Per-student outcome", body = [EnrollmentResultDto]),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody)
    )
)]
pub async fn enroll_students_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(course_id): Path<i64>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<Vec<EnrollmentResultDto>>, ApiError> {
    let results = state
        .enrollments
        .enroll_by_teacher(&user.id, course_id, &req.student_ids)
        .await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}/enrollments/{student_id}",
    tag = "teacher",
    params(
        ("id" = i64, Path, description = "Course id."),
        ("student_id" = String, Path, description = "Student to remove."),
        ("x-user-id" = String, Header, description = "The id of the calling user.")
    ),
    responses(
        (status = 204, description = "Student unenrolled"),
        (status = 403, description = "Caller does not teach the course", body = ErrorBody),
        (status = 404, description = "Student is not enrolled", body = ErrorBody)
    )
)]
pub async fn unenroll_student_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((course_id, student_id)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .enrollments
        .unenroll_by_teacher(&user.id, course_id, &student_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
