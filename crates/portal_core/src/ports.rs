//! crates/portal_core/src/ports.rs
//!
//! Defines the record store contract the core components are written against.
//! This trait is the boundary of the hexagonal architecture: the hosted relational
//! store, the in-memory store used by tests, or anything else can sit behind it.

use async_trait::async_trait;

use crate::domain::{
    Assignment, AssignmentId, AssignmentPatch, Competency, CompetencyId, CompetencyPatch,
    CompetencyValidation, Course, CourseId, Enrollment, Material, MaterialId, MaterialPatch,
    NewAssignment, NewCompetency, NewCourse, NewEnrollment, NewMaterial, NewSubmission, Role,
    Submission, SubmissionFilter, SubmissionId, SubmissionPatch, User,
};

//=========================================================================================
// Store Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
/// This abstracts away the specific errors of the backing datastore (network, SQL, ...).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting write: {0}")]
    Conflict(String),
    #[error("An unexpected store error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

//=========================================================================================
// Record Store Port
//=========================================================================================

#[async_trait]
pub trait RecordStore: Send + Sync {
    // --- Users ---
    async fn get_user(&self, user_id: &str) -> StoreResult<User>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>>;

    // --- Courses & Teachers ---
    async fn get_course(&self, course_id: CourseId) -> StoreResult<Course>;

    async fn list_courses(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Course>>;

    async fn list_courses_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Course>>;

    async fn list_course_teachers(&self, course_id: CourseId) -> StoreResult<Vec<String>>;

    /// Inserts the course together with its `course_teachers` link for
    /// `teacher_id`. Either both rows are written or neither is.
    async fn insert_course(&self, row: NewCourse, teacher_id: &str) -> StoreResult<Course>;

    // --- Enrollments ---
    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: CourseId,
    ) -> StoreResult<Option<Enrollment>>;

    async fn list_enrollments_for_course(&self, course_id: CourseId)
        -> StoreResult<Vec<Enrollment>>;

    async fn list_enrollments_for_student(&self, student_id: &str) -> StoreResult<Vec<Enrollment>>;

    /// Inserts the batch as one unit. Rows that already exist are skipped and
    /// left out of the returned list.
    async fn insert_enrollments(&self, rows: Vec<NewEnrollment>) -> StoreResult<Vec<Enrollment>>;

    async fn delete_enrollment(&self, student_id: &str, course_id: CourseId) -> StoreResult<()>;

    // --- Competencies ---
    async fn get_competency(&self, competency_id: CompetencyId) -> StoreResult<Competency>;

    async fn list_competencies(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Competency>>;

    async fn insert_competency(&self, row: NewCompetency) -> StoreResult<Competency>;

    async fn update_competency(
        &self,
        competency_id: CompetencyId,
        patch: CompetencyPatch,
    ) -> StoreResult<Competency>;

    async fn delete_competency(&self, competency_id: CompetencyId) -> StoreResult<()>;

    // --- Competency Validations ---
    async fn find_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<Option<CompetencyValidation>>;

    async fn list_validations_for_student(
        &self,
        student_id: &str,
    ) -> StoreResult<Vec<CompetencyValidation>>;

    async fn insert_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<CompetencyValidation>;

    async fn delete_validation(&self, student_id: &str, competency_id: CompetencyId)
        -> StoreResult<()>;

    // --- Assignments ---
    async fn get_assignment(&self, assignment_id: AssignmentId) -> StoreResult<Assignment>;

    async fn list_assignments(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Assignment>>;

    async fn insert_assignment(&self, row: NewAssignment) -> StoreResult<Assignment>;

    async fn update_assignment(
        &self,
        assignment_id: AssignmentId,
        patch: AssignmentPatch,
    ) -> StoreResult<Assignment>;

    // --- Submissions ---
    async fn get_submission(&self, submission_id: SubmissionId) -> StoreResult<Submission>;

    async fn list_submissions(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>>;

    async fn insert_submission(&self, row: NewSubmission) -> StoreResult<Submission>;

    /// Merges the set fields of `patch` into the stored row and returns the result.
    async fn update_submission(
        &self,
        submission_id: SubmissionId,
        patch: SubmissionPatch,
    ) -> StoreResult<Submission>;

    // --- Materials ---
    async fn get_material(&self, material_id: MaterialId) -> StoreResult<Material>;

    async fn list_materials(&self, course_id: CourseId) -> StoreResult<Vec<Material>>;

    async fn insert_material(&self, row: NewMaterial) -> StoreResult<Material>;

    async fn update_material(
        &self,
        material_id: MaterialId,
        patch: MaterialPatch,
    ) -> StoreResult<Material>;

    async fn delete_material(&self, material_id: MaterialId) -> StoreResult<()>;
}
