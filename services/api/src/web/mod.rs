pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod student;
pub mod teacher;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_user;
pub use rest::{course_progress_handler, dashboard_handler};
use state::AppState;

/// Builds every API route behind the identity middleware.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/courses", post(teacher::create_course_handler))
        .route("/courses/{id}/progress", get(course_progress_handler))
        .route(
            "/courses/{id}/materials",
            post(teacher::add_material_handler),
        )
        .route(
            "/materials/{id}",
            patch(teacher::update_material_handler).delete(teacher::delete_material_handler),
        )
        .route(
            "/courses/{id}/competencies",
            post(teacher::add_competency_handler),
        )
        .route(
            "/courses/{id}/assignments",
            post(teacher::create_assignment_handler),
        )
        .route(
            "/courses/{id}/enrollments",
            post(teacher::enroll_students_handler),
        )
        .route(
            "/courses/{id}/enrollments/{student_id}",
            delete(teacher::unenroll_student_handler),
        )
        .route(
            "/competencies/{id}",
            patch(teacher::update_competency_handler)
                .delete(teacher::delete_competency_handler),
        )
        .route(
            "/competencies/{id}/validation",
            post(student::validate_competency_handler)
                .delete(student::unvalidate_competency_handler),
        )
        .route(
            "/competencies/{id}/validation/toggle",
            post(student::toggle_competency_handler),
        )
        .route(
            "/assignments/{id}",
            patch(teacher::update_assignment_handler),
        )
        .route(
            "/assignments/{id}/status",
            get(student::assignment_status_handler),
        )
        .route(
            "/assignments/{id}/submissions",
            post(student::submit_assignment_handler),
        )
        .route(
            "/submissions/{id}/evaluation",
            patch(teacher::evaluate_submission_handler),
        )
        .route(
            "/evaluations/pending",
            get(teacher::pending_evaluations_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_user,
        ))
        .with_state(state)
}
