//! crates/portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the portal.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// Opaque identity handed to us by the external auth provider.
pub type UserId = String;
pub type CourseId = i64;
pub type CompetencyId = i64;
pub type AssignmentId = i64;
pub type SubmissionId = i64;
pub type MaterialId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// Picks the effective role from the raw role list stored on a user row.
    ///
    /// `admin` wins over `teacher`, which wins over `student`. A user with no
    /// recognised role is treated as a student.
    pub fn from_roles<S: AsRef<str>>(roles: &[S]) -> Self {
        let has = |name: &str| roles.iter().any(|r| r.as_ref().eq_ignore_ascii_case(name));
        if has("admin") {
            Role::Admin
        } else if has("teacher") {
            Role::Teacher
        } else {
            Role::Student
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
}

/// Authorization link between a student and a course. Keyed by the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub student_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_id: UserId,
    pub course_id: CourseId,
}

/// A gradable skill defined on exactly one course.
#[derive(Debug, Clone)]
pub struct Competency {
    pub id: CompetencyId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCompetency {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompetencyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A student's self-asserted mastery of a competency. Keyed by the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetencyValidation {
    pub student_id: UserId,
    pub competency_id: CompetencyId,
    pub validated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: AssignmentId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    /// Free-form kind chosen by the teacher ("assignment", "quiz", ...).
    pub kind: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

/// `None` keeps the stored value. For the nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub max_attempts: Option<Option<u32>>,
}

/// One attempt by a student at an assignment.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub attempt_number: u32,
    pub content: String,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<UserId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub assignment_id: AssignmentId,
    pub student_id: UserId,
    pub attempt_number: u32,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

/// Fields a teacher evaluation may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct SubmissionPatch {
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<UserId>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// Row filter for submission reads. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub student_id: Option<UserId>,
    pub assignment_ids: Option<Vec<AssignmentId>>,
    pub ungraded_only: bool,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(student_id) = &self.student_id {
            if &submission.student_id != student_id {
                return false;
            }
        }
        if let Some(ids) = &self.assignment_ids {
            if !ids.contains(&submission.assignment_id) {
                return false;
            }
        }
        !(self.ungraded_only && submission.score.is_some())
    }
}

/// A course attachment. The blob itself lives behind `file_url`.
#[derive(Debug, Clone)]
pub struct Material {
    pub id: MaterialId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
}
