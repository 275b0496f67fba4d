//! crates/portal_core/src/course.rs
//!
//! Course creation and the metadata of course materials. Uploading the file
//! behind a material happens elsewhere; only its URL is stored here.

use std::sync::Arc;

use tracing::info;

use crate::access::ensure_teaches;
use crate::domain::{Course, Material, MaterialId, MaterialPatch, NewCourse, NewMaterial, Role};
use crate::error::{CoreError, CoreResult};
use crate::ports::RecordStore;

#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn RecordStore>,
}

impl CourseService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Creates a course taught by `creator_id`. Students may not create courses.
    pub async fn create_course(&self, creator_id: &str, row: NewCourse) -> CoreResult<Course> {
        let creator = self.store.get_user(creator_id).await?;
        if creator.role == Role::Student {
            return Err(CoreError::Forbidden(format!(
                "user {} may not create courses",
                creator_id
            )));
        }
        let row = NewCourse {
            title: require_text("course title", &row.title)?,
            ..row
        };
        let course = self.store.insert_course(row, creator_id).await?;
        info!("Course {} created by {}", course.id, creator_id);
        Ok(course)
    }

    pub async fn add_material(&self, teacher_id: &str, row: NewMaterial) -> CoreResult<Material> {
        ensure_teaches(self.store.as_ref(), teacher_id, row.course_id).await?;
        let row = NewMaterial {
            title: require_text("material title", &row.title)?,
            file_url: require_text("material file_url", &row.file_url)?,
            ..row
        };
        let material = self.store.insert_material(row).await?;
        info!(
            "Material {} added to course {} by {}",
            material.id, material.course_id, teacher_id
        );
        Ok(material)
    }

    pub async fn update_material(
        &self,
        teacher_id: &str,
        material_id: MaterialId,
        patch: MaterialPatch,
    ) -> CoreResult<Material> {
        let existing = self.store.get_material(material_id).await?;
        ensure_teaches(self.store.as_ref(), teacher_id, existing.course_id).await?;
        let patch = MaterialPatch {
            title: patch
                .title
                .as_deref()
                .map(|t| require_text("material title", t))
                .transpose()?,
            file_url: patch
                .file_url
                .as_deref()
                .map(|u| require_text("material file_url", u))
                .transpose()?,
            ..patch
        };
        Ok(self.store.update_material(material_id, patch).await?)
    }

    pub async fn delete_material(&self, teacher_id: &str, material_id: MaterialId) -> CoreResult<()> {
        let existing = self.store.get_material(material_id).await?;
        ensure_teaches(self.store.as_ref(), teacher_id, existing.course_id).await?;
        self.store.delete_material(material_id).await?;
        info!("Material {} deleted by {}", material_id, teacher_id);
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn setup() -> (MemoryStore, CourseService) {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        store.add_user("t2", Role::Teacher);
        store.add_user("s1", Role::Student);
        let service = CourseService::new(Arc::new(store.clone()));
        (store, service)
    }

    fn syllabus(course_id: i64) -> NewMaterial {
        NewMaterial {
            course_id,
            title: "Syllabus".to_string(),
            description: None,
            file_url: "https://files.example.org/syllabus.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn creator_becomes_the_course_teacher() {
        let (store, service) = setup();
        let course = service
            .create_course(
                "t1",
                NewCourse {
                    title: "  Geometry ".to_string(),
                    description: Some("Shapes".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(course.title, "Geometry");

        assert_eq!(
            store.list_course_teachers(course.id).await.unwrap(),
            vec!["t1".to_string()]
        );
        let taught = store.list_courses_for_teacher("t1").await.unwrap();
        assert_eq!(taught.len(), 1);
        assert!(ensure_teaches(&store, "t1", course.id).await.is_ok());
    }

    #[tokio::test]
    async fn students_and_blank_titles_are_rejected() {
        let (store, service) = setup();
        let err = service
            .create_course(
                "s1",
                NewCourse {
                    title: "Geometry".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let err = service
            .create_course(
                "t1",
                NewCourse {
                    title: "   ".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert!(store.list_courses_for_teacher("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn material_metadata_lifecycle() {
        let (store, service) = setup();
        let course = store.add_course("Geometry", &["t1"]);

        let material = service.add_material("t1", syllabus(course.id)).await.unwrap();
        let updated = service
            .update_material(
                "t1",
                material.id,
                MaterialPatch {
                    description: Some("Week plan".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Syllabus");
        assert_eq!(updated.description.as_deref(), Some("Week plan"));

        service.delete_material("t1", material.id).await.unwrap();
        assert!(store.list_materials(course.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_course_teachers_touch_materials() {
        let (store, service) = setup();
        let course = store.add_course("Geometry", &["t1"]);

        let err = service.add_material("t2", syllabus(course.id)).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let material = service.add_material("t1", syllabus(course.id)).await.unwrap();
        let err = service.delete_material("t2", material.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        assert_eq!(store.list_materials(course.id).await.unwrap().len(), 1);
    }
}
