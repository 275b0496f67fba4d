//! crates/portal_core/src/evaluation.rs
//!
//! Applies teacher grades and feedback to submissions.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::access::ensure_teaches;
use crate::domain::{Submission, SubmissionFilter, SubmissionId, SubmissionPatch};
use crate::enrollment::retain_enrolled_submissions;
use crate::error::{CoreError, CoreResult, IntegrityWarning};
use crate::ports::{RecordStore, StoreError};

/// A single evaluation edit. Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Clone)]
pub struct EvaluationMutator {
    store: Arc<dyn RecordStore>,
}

impl EvaluationMutator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Merges `evaluation` into the submission and stamps `evaluated_at`.
    ///
    /// The grader must teach the course owning the submission's assignment.
    /// A grade outside 0-100 is rejected before anything is read or written.
    /// A submission whose student is no longer enrolled is reported as not found.
    pub async fn apply_evaluation(
        &self,
        submission_id: SubmissionId,
        evaluation: Evaluation,
        grader_id: &str,
    ) -> CoreResult<Submission> {
        if let Some(grade) = evaluation.grade {
            validate_grade(grade)?;
        }
        if evaluation.grade.is_none() && evaluation.feedback.is_none() {
            return Err(CoreError::InvalidInput(
                "an evaluation needs a grade or feedback".to_string(),
            ));
        }

        let submission = self.store.get_submission(submission_id).await?;
        let assignment = self.store.get_assignment(submission.assignment_id).await?;
        ensure_teaches(self.store.as_ref(), grader_id, assignment.course_id).await?;
        if self
            .store
            .find_enrollment(&submission.student_id, assignment.course_id)
            .await?
            .is_none()
        {
            let warning = IntegrityWarning::OrphanedSubmission {
                student_id: submission.student_id,
                submission_id,
            };
            warn!("Integrity warning: {}", warning);
            return Err(
                StoreError::NotFound(format!("Submission {} not found", submission_id)).into(),
            );
        }

        let patch = SubmissionPatch {
            score: evaluation.grade,
            feedback: evaluation.feedback,
            graded_by: Some(grader_id.to_string()),
            evaluated_at: Some(Utc::now()),
        };
        let updated = self.store.update_submission(submission_id, patch).await?;
        info!(
            "Submission {} evaluated by {} (score: {:?})",
            submission_id, grader_id, updated.score
        );
        Ok(updated)
    }

    /// Submissions to the teacher's courses that still have no score, oldest first.
    /// Submissions of students no longer enrolled are left out and logged.
    pub async fn pending_evaluations(&self, teacher_id: &str) -> CoreResult<Vec<Submission>> {
        let course_ids: Vec<_> = self
            .store
            .list_courses_for_teacher(teacher_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        let assignments = self.store.list_assignments(&course_ids).await?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let filter = SubmissionFilter {
            student_id: None,
            assignment_ids: Some(assignments.iter().map(|a| a.id).collect()),
            ungraded_only: true,
        };
        let (submissions, enrollments) = futures::try_join!(
            self.store.list_submissions(filter),
            try_join_all(
                course_ids
                    .iter()
                    .map(|course_id| self.store.list_enrollments_for_course(*course_id)),
            ),
        )?;
        let enrollments: Vec<_> = enrollments.into_iter().flatten().collect();

        let mut pending =
            retain_enrolled_submissions(&enrollments, &assignments, submissions).records;
        pending.sort_by_key(|s| (s.submitted_at, s.id));
        Ok(pending)
    }
}

pub fn validate_grade(grade: f64) -> CoreResult<()> {
    if (0.0..=100.0).contains(&grade) {
        Ok(())
    } else {
        Err(CoreError::InvalidGrade(grade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewAssignment, NewEnrollment, NewSubmission, Role};
    use crate::memory::MemoryStore;
    use crate::status::{resolve_status, AssignmentStatus};

    struct Fixture {
        store: MemoryStore,
        mutator: EvaluationMutator,
        submission_id: SubmissionId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        store.add_user("t2", Role::Teacher);
        store.add_user("s1", Role::Student);
        let course = store.add_course("Biology", &["t1"]);
        store
            .insert_enrollments(vec![NewEnrollment {
                student_id: "s1".to_string(),
                course_id: course.id,
            }])
            .await
            .unwrap();
        let assignment = store
            .insert_assignment(NewAssignment {
                course_id: course.id,
                title: "Lab report".to_string(),
                description: None,
                kind: "assignment".to_string(),
                start_date: None,
                end_date: None,
                max_attempts: None,
            })
            .await
            .unwrap();
        let submission = store
            .insert_submission(NewSubmission {
                assignment_id: assignment.id,
                student_id: "s1".to_string(),
                attempt_number: 1,
                content: "Results".to_string(),
                submitted_at: Utc::now(),
            })
            .await
            .unwrap();
        let mutator = EvaluationMutator::new(Arc::new(store.clone()));
        Fixture {
            store,
            mutator,
            submission_id: submission.id,
        }
    }

    #[test]
    fn grade_bounds() {
        assert!(validate_grade(0.0).is_ok());
        assert!(validate_grade(100.0).is_ok());
        assert_eq!(validate_grade(100.5), Err(CoreError::InvalidGrade(100.5)));
        assert_eq!(validate_grade(-1.0), Err(CoreError::InvalidGrade(-1.0)));
        assert!(validate_grade(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn grade_then_feedback_merge() {
        let f = fixture().await;

        let graded = f
            .mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: Some(85.0),
                    feedback: None,
                },
                "t1",
            )
            .await
            .unwrap();
        assert_eq!(graded.score, Some(85.0));
        let first_stamp = graded.evaluated_at.expect("evaluated_at set");

        let commented = f
            .mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: None,
                    feedback: Some("Clear method section".to_string()),
                },
                "t1",
            )
            .await
            .unwrap();
        assert_eq!(commented.score, Some(85.0));
        assert_eq!(commented.feedback.as_deref(), Some("Clear method section"));
        assert_eq!(commented.graded_by.as_deref(), Some("t1"));
        assert!(commented.evaluated_at.unwrap() >= first_stamp);
    }

    #[tokio::test]
    async fn graded_on_next_read() {
        let f = fixture().await;
        f.mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: Some(60.0),
                    feedback: None,
                },
                "t1",
            )
            .await
            .unwrap();

        let submission = f.store.get_submission(f.submission_id).await.unwrap();
        let assignment = f.store.get_assignment(submission.assignment_id).await.unwrap();
        let resolution = resolve_status(&assignment, &[submission]);
        assert_eq!(resolution.status, AssignmentStatus::Graded);
    }

    #[tokio::test]
    async fn rejects_out_of_range_grade_without_writing() {
        let f = fixture().await;
        let err = f
            .mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: Some(140.0),
                    feedback: None,
                },
                "t1",
            )
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidGrade(140.0));

        let submission = f.store.get_submission(f.submission_id).await.unwrap();
        assert!(submission.evaluated_at.is_none());
    }

    #[tokio::test]
    async fn foreign_teacher_is_forbidden() {
        let f = fixture().await;
        let err = f
            .mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: Some(50.0),
                    feedback: None,
                },
                "t2",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn empty_evaluation_is_invalid() {
        let f = fixture().await;
        let err = f
            .mutator
            .apply_evaluation(f.submission_id, Evaluation::default(), "t1")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn pending_list_drops_graded_submissions() {
        let f = fixture().await;
        assert_eq!(f.mutator.pending_evaluations("t1").await.unwrap().len(), 1);
        assert!(f.mutator.pending_evaluations("t2").await.unwrap().is_empty());

        f.mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: Some(75.0),
                    feedback: None,
                },
                "t1",
            )
            .await
            .unwrap();
        assert!(f.mutator.pending_evaluations("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unenrolled_student_drops_out_of_pending() {
        let f = fixture().await;
        let submission = f.store.get_submission(f.submission_id).await.unwrap();
        let assignment = f.store.get_assignment(submission.assignment_id).await.unwrap();
        f.store
            .delete_enrollment("s1", assignment.course_id)
            .await
            .unwrap();

        assert!(f.mutator.pending_evaluations("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unenrolled_student_cannot_be_graded() {
        let f = fixture().await;
        let submission = f.store.get_submission(f.submission_id).await.unwrap();
        let assignment = f.store.get_assignment(submission.assignment_id).await.unwrap();
        f.store
            .delete_enrollment("s1", assignment.course_id)
            .await
            .unwrap();

        let err = f
            .mutator
            .apply_evaluation(
                f.submission_id,
                Evaluation {
                    grade: Some(90.0),
                    feedback: None,
                },
                "t1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::NotFound(_))));

        let stored = f.store.get_submission(f.submission_id).await.unwrap();
        assert_eq!(stored.score, None);
        assert!(stored.evaluated_at.is_none());
    }
}
