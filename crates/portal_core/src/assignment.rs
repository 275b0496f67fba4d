//! crates/portal_core/src/assignment.rs
//!
//! Teacher-side assignment management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::access::ensure_teaches;
use crate::domain::{Assignment, AssignmentId, AssignmentPatch, NewAssignment};
use crate::error::{CoreError, CoreResult};
use crate::ports::RecordStore;

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn RecordStore>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create_assignment(
        &self,
        teacher_id: &str,
        row: NewAssignment,
    ) -> CoreResult<Assignment> {
        ensure_teaches(self.store.as_ref(), teacher_id, row.course_id).await?;
        if row.title.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "assignment title must not be empty".to_string(),
            ));
        }
        check_window(row.start_date, row.end_date)?;
        check_max_attempts(row.max_attempts)?;

        let assignment = self.store.insert_assignment(row).await?;
        info!(
            "Assignment {} created in course {} by {}",
            assignment.id, assignment.course_id, teacher_id
        );
        Ok(assignment)
    }

    /// Applies `patch`; the resulting window and attempt limit are validated as a whole.
    pub async fn update_assignment(
        &self,
        teacher_id: &str,
        assignment_id: AssignmentId,
        patch: AssignmentPatch,
    ) -> CoreResult<Assignment> {
        let existing = self.store.get_assignment(assignment_id).await?;
        ensure_teaches(self.store.as_ref(), teacher_id, existing.course_id).await?;
        if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
            return Err(CoreError::InvalidInput(
                "assignment title must not be empty".to_string(),
            ));
        }
        check_window(
            patch.start_date.unwrap_or(existing.start_date),
            patch.end_date.unwrap_or(existing.end_date),
        )?;
        check_max_attempts(patch.max_attempts.flatten())?;

        Ok(self.store.update_assignment(assignment_id, patch).await?)
    }
}

fn check_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> CoreResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(CoreError::InvalidInput(
            "assignment start date is after its end date".to_string(),
        )),
        _ => Ok(()),
    }
}

fn check_max_attempts(max_attempts: Option<u32>) -> CoreResult<()> {
    if max_attempts == Some(0) {
        return Err(CoreError::InvalidInput(
            "max_attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::memory::MemoryStore;
    use chrono::Duration;

    fn new_assignment(course_id: i64) -> NewAssignment {
        NewAssignment {
            course_id,
            title: "Quiz 1".to_string(),
            description: None,
            kind: "quiz".to_string(),
            start_date: None,
            end_date: None,
            max_attempts: Some(2),
        }
    }

    #[tokio::test]
    async fn owner_creates_and_updates() {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        let course = store.add_course("Physics", &["t1"]);
        let service = AssignmentService::new(Arc::new(store));

        let created = service
            .create_assignment("t1", new_assignment(course.id))
            .await
            .unwrap();
        assert_eq!(created.max_attempts, Some(2));

        let updated = service
            .update_assignment(
                "t1",
                created.id,
                AssignmentPatch {
                    max_attempts: Some(Some(3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.max_attempts, Some(3));
        assert_eq!(updated.title, "Quiz 1");
    }

    #[tokio::test]
    async fn rejects_bad_input_and_foreign_teachers() {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        store.add_user("t2", Role::Teacher);
        let course = store.add_course("Physics", &["t1"]);
        let service = AssignmentService::new(Arc::new(store));

        let err = service
            .create_assignment("t2", new_assignment(course.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let now = Utc::now();
        let backwards = NewAssignment {
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
            ..new_assignment(course.id)
        };
        let err = service.create_assignment("t1", backwards).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));

        let zero = NewAssignment {
            max_attempts: Some(0),
            ..new_assignment(course.id)
        };
        let err = service.create_assignment("t1", zero).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn limits_and_deadlines_can_be_cleared() {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        let course = store.add_course("Physics", &["t1"]);
        let service = AssignmentService::new(Arc::new(store));

        let created = service
            .create_assignment(
                "t1",
                NewAssignment {
                    end_date: Some(Utc::now()),
                    ..new_assignment(course.id)
                },
            )
            .await
            .unwrap();
        assert!(created.end_date.is_some());

        let cleared = service
            .update_assignment(
                "t1",
                created.id,
                AssignmentPatch {
                    end_date: Some(None),
                    max_attempts: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.end_date, None);
        assert_eq!(cleared.max_attempts, None);

        let untouched = service
            .update_assignment(
                "t1",
                created.id,
                AssignmentPatch {
                    title: Some("Quiz 1b".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(untouched.title, "Quiz 1b");
        assert_eq!(untouched.max_attempts, None);
    }
}
