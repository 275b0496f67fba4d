//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RecordStore` port from the `portal_core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Queries are built at runtime with `query_as` and `FromRow`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::domain::{
    Assignment, AssignmentId, AssignmentPatch, Competency, CompetencyId, CompetencyPatch,
    CompetencyValidation, Course, CourseId, Enrollment, Material, MaterialId, MaterialPatch,
    NewAssignment, NewCompetency, NewCourse, NewEnrollment, NewMaterial, NewSubmission, Role,
    Submission, SubmissionFilter, SubmissionId, SubmissionPatch, User,
};
use portal_core::ports::{RecordStore, StoreError, StoreResult};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RecordStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Translates a driver error into the port's error type.
///
/// `not_found` describes the row the query was looking for.
fn store_error(e: sqlx::Error, not_found: impl FnOnce() -> String) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound(not_found()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // unique_violation
            Some("23505") => StoreError::Conflict(db.message().to_string()),
            // foreign_key_violation
            Some("23503") => StoreError::NotFound(not_found()),
            _ => StoreError::Unexpected(db.to_string()),
        },
        other => StoreError::Unexpected(other.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> StoreError {
    StoreError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, email, full_name, roles, created_at";
const COURSE_COLUMNS: &str = "id, title, description";
const ENROLLMENT_COLUMNS: &str = "student_id, course_id, enrolled_at";
const COMPETENCY_COLUMNS: &str = "id, course_id, title, description";
const VALIDATION_COLUMNS: &str = "student_id, competence_id, validated_at";
const ASSIGNMENT_COLUMNS: &str =
    "id, course_id, title, description, type AS kind, start_date, end_date, max_attempts";
const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, attempt_number, content, score, \
     feedback, graded_by, submitted_at, evaluated_at, created_at";
const MATERIAL_COLUMNS: &str = "id, course_id, title, description, file_url";

#[derive(FromRow)]
struct UserRecord {
    id: String,
    email: String,
    full_name: Option<String>,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn into_domain(self) -> User {
        User {
            role: Role::from_roles(&self.roles),
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CourseRecord {
    id: i64,
    title: String,
    description: Option<String>,
}
impl CourseRecord {
    fn into_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct EnrollmentRecord {
    student_id: String,
    course_id: i64,
    enrolled_at: DateTime<Utc>,
}
impl EnrollmentRecord {
    fn into_domain(self) -> Enrollment {
        Enrollment {
            student_id: self.student_id,
            course_id: self.course_id,
            enrolled_at: self.enrolled_at,
        }
    }
}

#[derive(FromRow)]
struct CompetencyRecord {
    id: i64,
    course_id: i64,
    title: String,
    description: Option<String>,
}
impl CompetencyRecord {
    fn into_domain(self) -> Competency {
        Competency {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct ValidationRecord {
    student_id: String,
    competence_id: i64,
    validated_at: DateTime<Utc>,
}
impl ValidationRecord {
    fn into_domain(self) -> CompetencyValidation {
        CompetencyValidation {
            student_id: self.student_id,
            competency_id: self.competence_id,
            validated_at: self.validated_at,
        }
    }
}

#[derive(FromRow)]
struct AssignmentRecord {
    id: i64,
    course_id: i64,
    title: String,
    description: Option<String>,
    kind: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    max_attempts: Option<i32>,
}
impl AssignmentRecord {
    fn into_domain(self) -> Assignment {
        Assignment {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            description: self.description,
            kind: self.kind,
            start_date: self.start_date,
            end_date: self.end_date,
            // The CHECK constraint keeps this positive.
            max_attempts: self.max_attempts.map(|n| n as u32),
        }
    }
}

#[derive(FromRow)]
struct SubmissionRecord {
    id: i64,
    assignment_id: i64,
    student_id: String,
    attempt_number: i32,
    content: String,
    score: Option<f64>,
    feedback: Option<String>,
    graded_by: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    evaluated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}
impl SubmissionRecord {
    fn into_domain(self) -> Submission {
        Submission {
            id: self.id,
            assignment_id: self.assignment_id,
            student_id: self.student_id,
            attempt_number: self.attempt_number as u32,
            content: self.content,
            score: self.score,
            feedback: self.feedback,
            graded_by: self.graded_by,
            submitted_at: self.submitted_at,
            evaluated_at: self.evaluated_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MaterialRecord {
    id: i64,
    course_id: i64,
    title: String,
    description: Option<String>,
    file_url: String,
}
impl MaterialRecord {
    fn into_domain(self) -> Material {
        Material {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            description: self.description,
            file_url: self.file_url,
        }
    }
}

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for DbAdapter {
    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("User {} not found", user_id)))?;
        Ok(record.into_domain())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY created_at ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        // The effective role depends on the whole role list, so filter after mapping.
        let users = self.list_users().await?;
        Ok(users.into_iter().filter(|u| u.role == role).collect())
    }

    async fn get_course(&self, course_id: CourseId) -> StoreResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Course {} not found", course_id)))?;
        Ok(record.into_domain())
    }

    async fn list_courses(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {} FROM courses WHERE id = ANY($1) ORDER BY id ASC",
            COURSE_COLUMNS
        ))
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn list_courses_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(
            "SELECT c.id, c.title, c.description FROM courses c \
             JOIN course_teachers ct ON ct.course_id = c.id \
             WHERE ct.teacher_id = $1 ORDER BY c.id ASC",
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn list_course_teachers(&self, course_id: CourseId) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT teacher_id FROM course_teachers WHERE course_id = $1 ORDER BY teacher_id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn insert_course(&self, row: NewCourse, teacher_id: &str) -> StoreResult<Course> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "INSERT INTO courses (title, description) VALUES ($1, $2) RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(row.title)
        .bind(row.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        sqlx::query("INSERT INTO course_teachers (course_id, teacher_id) VALUES ($1, $2)")
            .bind(record.id)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error(e, || format!("User {} not found", teacher_id)))?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.into_domain())
    }

    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: CourseId,
    ) -> StoreResult<Option<Enrollment>> {
        let record = sqlx::query_as::<_, EnrollmentRecord>(&format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.into_domain()))
    }

    async fn list_enrollments_for_course(
        &self,
        course_id: CourseId,
    ) -> StoreResult<Vec<Enrollment>> {
        let records = sqlx::query_as::<_, EnrollmentRecord>(&format!(
            "SELECT {} FROM enrollments WHERE course_id = $1 ORDER BY enrolled_at ASC",
            ENROLLMENT_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn list_enrollments_for_student(&self, student_id: &str) -> StoreResult<Vec<Enrollment>> {
        let records = sqlx::query_as::<_, EnrollmentRecord>(&format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at ASC",
            ENROLLMENT_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_enrollments(&self, rows: Vec<NewEnrollment>) -> StoreResult<Vec<Enrollment>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let (student_ids, course_ids): (Vec<String>, Vec<i64>) = rows
            .into_iter()
            .map(|row| (row.student_id, row.course_id))
            .unzip();

        // Existing pairs are skipped and left out of RETURNING.
        let records = sqlx::query_as::<_, EnrollmentRecord>(&format!(
            "INSERT INTO enrollments (student_id, course_id) \
             SELECT * FROM UNNEST($1::text[], $2::bigint[]) \
             ON CONFLICT (student_id, course_id) DO NOTHING \
             RETURNING {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(student_ids)
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, || "Enrollment references an unknown user or course".to_string()))?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn delete_enrollment(&self, student_id: &str, course_id: CourseId) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM enrollments WHERE student_id = $1 AND course_id = $2")
                .bind(student_id)
                .bind(course_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "{} is not enrolled in course {}",
                student_id, course_id
            )));
        }
        Ok(())
    }

    async fn get_competency(&self, competency_id: CompetencyId) -> StoreResult<Competency> {
        let record = sqlx::query_as::<_, CompetencyRecord>(&format!(
            "SELECT {} FROM competence WHERE id = $1",
            COMPETENCY_COLUMNS
        ))
        .bind(competency_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Competency {} not found", competency_id)))?;
        Ok(record.into_domain())
    }

    async fn list_competencies(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Competency>> {
        let records = sqlx::query_as::<_, CompetencyRecord>(&format!(
            "SELECT {} FROM competence WHERE course_id = ANY($1) ORDER BY id ASC",
            COMPETENCY_COLUMNS
        ))
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_competency(&self, row: NewCompetency) -> StoreResult<Competency> {
        let record = sqlx::query_as::<_, CompetencyRecord>(&format!(
            "INSERT INTO competence (course_id, title, description) VALUES ($1, $2, $3) \
             RETURNING {}",
            COMPETENCY_COLUMNS
        ))
        .bind(row.course_id)
        .bind(&row.title)
        .bind(&row.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Course {} not found", row.course_id)))?;
        Ok(record.into_domain())
    }

    async fn update_competency(
        &self,
        competency_id: CompetencyId,
        patch: CompetencyPatch,
    ) -> StoreResult<Competency> {
        let record = sqlx::query_as::<_, CompetencyRecord>(&format!(
            "UPDATE competence SET title = COALESCE($2, title), \
             description = COALESCE($3, description) WHERE id = $1 RETURNING {}",
            COMPETENCY_COLUMNS
        ))
        .bind(competency_id)
        .bind(patch.title)
        .bind(patch.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Competency {} not found", competency_id)))?;
        Ok(record.into_domain())
    }

    async fn delete_competency(&self, competency_id: CompetencyId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM competence WHERE id = $1")
            .bind(competency_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Competency {} not found",
                competency_id
            )));
        }
        Ok(())
    }

    async fn find_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<Option<CompetencyValidation>> {
        let record = sqlx::query_as::<_, ValidationRecord>(&format!(
            "SELECT {} FROM competence_val WHERE student_id = $1 AND competence_id = $2",
            VALIDATION_COLUMNS
        ))
        .bind(student_id)
        .bind(competency_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.into_domain()))
    }

    async fn list_validations_for_student(
        &self,
        student_id: &str,
    ) -> StoreResult<Vec<CompetencyValidation>> {
        let records = sqlx::query_as::<_, ValidationRecord>(&format!(
            "SELECT {} FROM competence_val WHERE student_id = $1 ORDER BY validated_at ASC",
            VALIDATION_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<CompetencyValidation> {
        let record = sqlx::query_as::<_, ValidationRecord>(&format!(
            "INSERT INTO competence_val (student_id, competence_id) VALUES ($1, $2) RETURNING {}",
            VALIDATION_COLUMNS
        ))
        .bind(student_id)
        .bind(competency_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("User {} not found", student_id)))?;
        Ok(record.into_domain())
    }

    async fn delete_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM competence_val WHERE student_id = $1 AND competence_id = $2")
            .bind(student_id)
            .bind(competency_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_assignment(&self, assignment_id: AssignmentId) -> StoreResult<Assignment> {
        let record = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "SELECT {} FROM assignments WHERE id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(assignment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Assignment {} not found", assignment_id)))?;
        Ok(record.into_domain())
    }

    async fn list_assignments(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Assignment>> {
        let records = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "SELECT {} FROM assignments WHERE course_id = ANY($1) ORDER BY id ASC",
            ASSIGNMENT_COLUMNS
        ))
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_assignment(&self, row: NewAssignment) -> StoreResult<Assignment> {
        let record = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "INSERT INTO assignments \
             (course_id, title, description, type, start_date, end_date, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(row.course_id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(&row.kind)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.max_attempts.map(|n| n as i32))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Course {} not found", row.course_id)))?;
        Ok(record.into_domain())
    }

    async fn update_assignment(
        &self,
        assignment_id: AssignmentId,
        patch: AssignmentPatch,
    ) -> StoreResult<Assignment> {
        let record = sqlx::query_as::<_, AssignmentRecord>(&format!(
            "UPDATE assignments SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             type = COALESCE($4, type), \
             start_date = CASE WHEN $5 THEN $6 ELSE start_date END, \
             end_date = CASE WHEN $7 THEN $8 ELSE end_date END, \
             max_attempts = CASE WHEN $9 THEN $10 ELSE max_attempts END \
             WHERE id = $1 RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(assignment_id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.kind)
        .bind(patch.start_date.is_some())
        .bind(patch.start_date.flatten())
        .bind(patch.end_date.is_some())
        .bind(patch.end_date.flatten())
        .bind(patch.max_attempts.is_some())
        .bind(patch.max_attempts.flatten().map(|n| n as i32))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Assignment {} not found", assignment_id)))?;
        Ok(record.into_domain())
    }

    async fn get_submission(&self, submission_id: SubmissionId) -> StoreResult<Submission> {
        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "SELECT {} FROM submissions WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Submission {} not found", submission_id)))?;
        Ok(record.into_domain())
    }

    async fn list_submissions(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM submissions WHERE TRUE",
            SUBMISSION_COLUMNS
        ));
        if let Some(student_id) = filter.student_id {
            query.push(" AND student_id = ").push_bind(student_id);
        }
        if let Some(assignment_ids) = filter.assignment_ids {
            query
                .push(" AND assignment_id = ANY(")
                .push_bind(assignment_ids)
                .push(")");
        }
        if filter.ungraded_only {
            query.push(" AND score IS NULL");
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let records = query
            .build_query_as::<SubmissionRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_submission(&self, row: NewSubmission) -> StoreResult<Submission> {
        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "INSERT INTO submissions \
             (assignment_id, student_id, attempt_number, content, submitted_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(row.assignment_id)
        .bind(&row.student_id)
        .bind(row.attempt_number as i32)
        .bind(&row.content)
        .bind(row.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Assignment {} not found", row.assignment_id)))?;
        Ok(record.into_domain())
    }

    async fn update_submission(
        &self,
        submission_id: SubmissionId,
        patch: SubmissionPatch,
    ) -> StoreResult<Submission> {
        // Unset patch fields keep the stored value.
        let record = sqlx::query_as::<_, SubmissionRecord>(&format!(
            "UPDATE submissions SET \
             score = COALESCE($2, score), \
             feedback = COALESCE($3, feedback), \
             graded_by = COALESCE($4, graded_by), \
             evaluated_at = COALESCE($5, evaluated_at) \
             WHERE id = $1 RETURNING {}",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .bind(patch.score)
        .bind(patch.feedback)
        .bind(patch.graded_by)
        .bind(patch.evaluated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Submission {} not found", submission_id)))?;
        Ok(record.into_domain())
    }

    async fn get_material(&self, material_id: MaterialId) -> StoreResult<Material> {
        let record = sqlx::query_as::<_, MaterialRecord>(&format!(
            "SELECT {} FROM course_attachments WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Material {} not found", material_id)))?;
        Ok(record.into_domain())
    }

    async fn list_materials(&self, course_id: CourseId) -> StoreResult<Vec<Material>> {
        let records = sqlx::query_as::<_, MaterialRecord>(&format!(
            "SELECT {} FROM course_attachments WHERE course_id = $1 ORDER BY id ASC",
            MATERIAL_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.into_domain()).collect())
    }

    async fn insert_material(&self, row: NewMaterial) -> StoreResult<Material> {
        let record = sqlx::query_as::<_, MaterialRecord>(&format!(
            "INSERT INTO course_attachments (course_id, title, description, file_url) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            MATERIAL_COLUMNS
        ))
        .bind(row.course_id)
        .bind(row.title)
        .bind(row.description)
        .bind(row.file_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Course {} not found", row.course_id)))?;
        Ok(record.into_domain())
    }

    async fn update_material(
        &self,
        material_id: MaterialId,
        patch: MaterialPatch,
    ) -> StoreResult<Material> {
        let record = sqlx::query_as::<_, MaterialRecord>(&format!(
            "UPDATE course_attachments SET title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             file_url = COALESCE($4, file_url) WHERE id = $1 RETURNING {}",
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.file_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, || format!("Material {} not found", material_id)))?;
        Ok(record.into_domain())
    }

    async fn delete_material(&self, material_id: MaterialId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM course_attachments WHERE id = $1")
            .bind(material_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "Material {} not found",
                material_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_become_not_found() {
        let err = store_error(sqlx::Error::RowNotFound, || "Course 3 not found".to_string());
        assert_eq!(err, StoreError::NotFound("Course 3 not found".to_string()));
    }

    #[test]
    fn other_driver_failures_are_unexpected() {
        let err = store_error(sqlx::Error::PoolTimedOut, String::new);
        assert!(matches!(err, StoreError::Unexpected(_)));
    }

    #[test]
    fn roles_resolve_when_mapping_users() {
        let user = UserRecord {
            id: "u1".to_string(),
            email: "u1@example.org".to_string(),
            full_name: None,
            roles: vec!["student".to_string(), "teacher".to_string()],
            created_at: Utc::now(),
        }
        .into_domain();
        assert_eq!(user.role, Role::Teacher);
    }
}
