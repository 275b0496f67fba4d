//! crates/portal_core/src/competency.rs
//!
//! Student self-validation of competencies and the teacher-side competency CRUD.

use std::sync::Arc;

use tracing::info;

use crate::access::ensure_teaches;
use crate::domain::{Competency, CompetencyId, CompetencyPatch, NewCompetency};
use crate::enrollment::EnrollmentGuard;
use crate::error::{CoreError, CoreResult};
use crate::ports::{RecordStore, StoreError};

#[derive(Clone)]
pub struct CompetencyService {
    store: Arc<dyn RecordStore>,
    guard: EnrollmentGuard,
}

impl CompetencyService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let guard = EnrollmentGuard::new(store.clone());
        Self { store, guard }
    }

    // --- Student side ---

    /// Marks the competency as validated by the student. Validating twice is a no-op.
    pub async fn validate(&self, student_id: &str, competency_id: CompetencyId) -> CoreResult<()> {
        self.guard
            .ensure_can_validate_competency(student_id, competency_id)
            .await?;
        if self
            .store
            .find_validation(student_id, competency_id)
            .await?
            .is_some()
        {
            return Ok(());
        }
        match self.store.insert_validation(student_id, competency_id).await {
            // Lost a race with another validate of the same pair.
            Ok(_) | Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
        info!("{} validated competency {}", student_id, competency_id);
        Ok(())
    }

    pub async fn unvalidate(&self, student_id: &str, competency_id: CompetencyId) -> CoreResult<()> {
        self.guard
            .ensure_can_validate_competency(student_id, competency_id)
            .await?;
        self.store
            .delete_validation(student_id, competency_id)
            .await?;
        info!("{} withdrew validation of competency {}", student_id, competency_id);
        Ok(())
    }

    /// Flips the validation state and returns the new one, read back from the store.
    pub async fn toggle(&self, student_id: &str, competency_id: CompetencyId) -> CoreResult<bool> {
        let current = self
            .store
            .find_validation(student_id, competency_id)
            .await?
            .is_some();
        if current {
            self.unvalidate(student_id, competency_id).await?;
        } else {
            self.validate(student_id, competency_id).await?;
        }
        Ok(self
            .store
            .find_validation(student_id, competency_id)
            .await?
            .is_some())
    }

    // --- Teacher side ---

    pub async fn add_competency(
        &self,
        teacher_id: &str,
        row: NewCompetency,
    ) -> CoreResult<Competency> {
        ensure_teaches(self.store.as_ref(), teacher_id, row.course_id).await?;
        let row = NewCompetency {
            title: require_title(&row.title)?,
            ..row
        };
        let competency = self.store.insert_competency(row).await?;
        info!(
            "Competency {} added to course {} by {}",
            competency.id, competency.course_id, teacher_id
        );
        Ok(competency)
    }

    pub async fn update_competency(
        &self,
        teacher_id: &str,
        competency_id: CompetencyId,
        patch: CompetencyPatch,
    ) -> CoreResult<Competency> {
        let existing = self.store.get_competency(competency_id).await?;
        ensure_teaches(self.store.as_ref(), teacher_id, existing.course_id).await?;
        let patch = CompetencyPatch {
            title: patch.title.as_deref().map(require_title).transpose()?,
            ..patch
        };
        Ok(self.store.update_competency(competency_id, patch).await?)
    }

    /// Deletes the competency. Existing validations of it are left in place and
    /// stop counting toward progress.
    pub async fn delete_competency(
        &self,
        teacher_id: &str,
        competency_id: CompetencyId,
    ) -> CoreResult<()> {
        let existing = self.store.get_competency(competency_id).await?;
        ensure_teaches(self.store.as_ref(), teacher_id, existing.course_id).await?;
        self.store.delete_competency(competency_id).await?;
        info!(
            "Competency {} removed from course {} by {}",
            competency_id, existing.course_id, teacher_id
        );
        Ok(())
    }
}

fn require_title(title: &str) -> CoreResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoreError::InvalidInput(
            "competency title must not be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewEnrollment, Role};
    use crate::memory::MemoryStore;

    async fn setup() -> (MemoryStore, CompetencyService, Competency) {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        store.add_user("s1", Role::Student);
        let course = store.add_course("History", &["t1"]);
        store
            .insert_enrollments(vec![NewEnrollment {
                student_id: "s1".to_string(),
                course_id: course.id,
            }])
            .await
            .unwrap();
        let service = CompetencyService::new(Arc::new(store.clone()));
        let competency = service
            .add_competency(
                "t1",
                NewCompetency {
                    course_id: course.id,
                    title: "  Source criticism ".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        (store, service, competency)
    }

    #[tokio::test]
    async fn add_trims_title() {
        let (_store, _service, competency) = setup().await;
        assert_eq!(competency.title, "Source criticism");
    }

    #[tokio::test]
    async fn validate_twice_keeps_one_row() {
        let (store, service, competency) = setup().await;
        service.validate("s1", competency.id).await.unwrap();
        service.validate("s1", competency.id).await.unwrap();
        assert_eq!(store.list_validations_for_student("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn toggle_round_trips() {
        let (_store, service, competency) = setup().await;
        assert!(service.toggle("s1", competency.id).await.unwrap());
        assert!(!service.toggle("s1", competency.id).await.unwrap());
    }

    #[tokio::test]
    async fn outsider_cannot_validate() {
        let (store, service, competency) = setup().await;
        store.add_user("s9", Role::Student);
        let err = service.validate("s9", competency.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotEnrolled { .. }));
    }

    #[tokio::test]
    async fn only_owner_edits_competencies() {
        let (store, service, competency) = setup().await;
        store.add_user("t2", Role::Teacher);

        let err = service
            .update_competency(
                "t2",
                competency.id,
                CompetencyPatch {
                    title: Some("Hijacked".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = service.delete_competency("t2", competency.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = service
            .update_competency(
                "t1",
                competency.id,
                CompetencyPatch {
                    title: Some("   ".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
