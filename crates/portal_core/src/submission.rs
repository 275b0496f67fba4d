//! crates/portal_core/src/submission.rs
//!
//! The student submission path: enrollment check, attempt admission, insert.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{AssignmentId, NewSubmission, Submission, SubmissionFilter};
use crate::enrollment::EnrollmentGuard;
use crate::error::{CoreError, CoreResult};
use crate::ports::RecordStore;
use crate::status::{admit_attempt, resolve_status, StatusResolution};

#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn RecordStore>,
    guard: EnrollmentGuard,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let guard = EnrollmentGuard::new(store.clone());
        Self { store, guard }
    }

    async fn own_submissions(
        &self,
        student_id: &str,
        assignment_id: AssignmentId,
    ) -> CoreResult<Vec<Submission>> {
        Ok(self
            .store
            .list_submissions(SubmissionFilter {
                student_id: Some(student_id.to_string()),
                assignment_ids: Some(vec![assignment_id]),
                ungraded_only: false,
            })
            .await?)
    }

    /// Records a new attempt by `student_id`.
    pub async fn submit(
        &self,
        student_id: &str,
        assignment_id: AssignmentId,
        content: &str,
    ) -> CoreResult<Submission> {
        if content.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "submission content must not be empty".to_string(),
            ));
        }
        let assignment = self.guard.ensure_can_submit(student_id, assignment_id).await?;
        let existing = self.own_submissions(student_id, assignment_id).await?;
        let attempt_number = admit_attempt(&assignment, &existing)?;

        // A concurrent submit of the same attempt number is rejected by the
        // store's uniqueness rule and surfaces as a store conflict.
        let submission = self
            .store
            .insert_submission(NewSubmission {
                assignment_id,
                student_id: student_id.to_string(),
                attempt_number,
                content: content.to_string(),
                submitted_at: Utc::now(),
            })
            .await?;
        info!(
            "{} submitted attempt {} of assignment {}",
            student_id, attempt_number, assignment_id
        );
        Ok(submission)
    }

    /// Current status of the assignment for the student, from a fresh read.
    pub async fn status(
        &self,
        student_id: &str,
        assignment_id: AssignmentId,
    ) -> CoreResult<StatusResolution> {
        let assignment = self.guard.ensure_can_submit(student_id, assignment_id).await?;
        let submissions = self.own_submissions(student_id, assignment_id).await?;
        Ok(resolve_status(&assignment, &submissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewAssignment, NewEnrollment, Role};
    use crate::memory::MemoryStore;
    use crate::status::AssignmentStatus;

    async fn setup(max_attempts: Option<u32>) -> (MemoryStore, SubmissionService, AssignmentId) {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        store.add_user("s1", Role::Student);
        let course = store.add_course("Chemistry", &["t1"]);
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
                title: "Titration".to_string(),
                description: None,
                kind: "assignment".to_string(),
                start_date: None,
                end_date: None,
                max_attempts,
            })
            .await
            .unwrap();
        let service = SubmissionService::new(Arc::new(store.clone()));
        (store, service, assignment.id)
    }

    #[tokio::test]
    async fn attempts_are_numbered_in_order() {
        let (_store, service, assignment_id) = setup(None).await;
        let first = service.submit("s1", assignment_id, "v1").await.unwrap();
        let second = service.submit("s1", assignment_id, "v2").await.unwrap();
        assert_eq!(first.attempt_number, 1);
        assert_eq!(second.attempt_number, 2);

        let status = service.status("s1", assignment_id).await.unwrap();
        assert_eq!(status.status, AssignmentStatus::Submitted);
        assert_eq!(status.latest_submission.map(|s| s.id), Some(second.id));
    }

    #[tokio::test]
    async fn third_attempt_over_limit_is_rejected() {
        let (store, service, assignment_id) = setup(Some(2)).await;
        service.submit("s1", assignment_id, "v1").await.unwrap();
        service.submit("s1", assignment_id, "v2").await.unwrap();
        let err = service.submit("s1", assignment_id, "v3").await.unwrap_err();
        assert_eq!(
            err,
            CoreError::AttemptLimitExceeded {
                assignment_id,
                max_attempts: 2
            }
        );
        let rows = store
            .list_submissions(SubmissionFilter::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn unenrolled_student_cannot_submit() {
        let (store, service, assignment_id) = setup(None).await;
        store.add_user("s2", Role::Student);
        let err = service.submit("s2", assignment_id, "hello").await.unwrap_err();
        assert!(matches!(err, CoreError::NotEnrolled { .. }));
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let (_store, service, assignment_id) = setup(None).await;
        let err = service.submit("s1", assignment_id, "  \n").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
