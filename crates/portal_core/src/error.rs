//! crates/portal_core/src/error.rs
//!
//! Error taxonomy shared by the core components.

use crate::domain::{AssignmentId, CompetencyId, CourseId, SubmissionId};
use crate::ports::StoreError;

/// Terminal failures of a user-triggered action.
///
/// Everything except `Store` is a validation or authorization outcome and is
/// meant to reach the caller unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Student {student_id} is not enrolled in course {course_id}")]
    NotEnrolled { student_id: String, course_id: CourseId },

    #[error("Assignment {assignment_id} allows at most {max_attempts} attempt(s)")]
    AttemptLimitExceeded {
        assignment_id: AssignmentId,
        max_attempts: u32,
    },

    #[error("Grade {0} is outside the range 0-100")]
    InvalidGrade(f64),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Inconsistent state found while deriving progress or status.
///
/// Never returned as an error. The offending record is dropped from the
/// computation and the warning is logged and handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityWarning {
    /// A validation whose competency belongs to a course the student is not enrolled in.
    #[error("validation of competency {competency_id} by {student_id} has no backing enrollment")]
    OrphanedValidation {
        student_id: String,
        competency_id: CompetencyId,
    },
    /// A validation pointing at a competency that no longer exists.
    #[error("validation by {student_id} references deleted competency {competency_id}")]
    DanglingValidation {
        student_id: String,
        competency_id: CompetencyId,
    },
    /// A submission to an assignment of a course the student is not enrolled in.
    #[error("submission {submission_id} by {student_id} has no backing enrollment")]
    OrphanedSubmission {
        student_id: String,
        submission_id: SubmissionId,
    },
    /// Two submissions for the same (assignment, student) share an attempt number.
    #[error("attempt {attempt_number} of assignment {assignment_id} by {student_id} exists more than once")]
    DuplicateAttempt {
        student_id: String,
        assignment_id: AssignmentId,
        attempt_number: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_render_the_offending_record() {
        let warning = IntegrityWarning::OrphanedSubmission {
            student_id: "s1".to_string(),
            submission_id: 7,
        };
        assert_eq!(
            warning.to_string(),
            "submission 7 by s1 has no backing enrollment"
        );
    }
}
