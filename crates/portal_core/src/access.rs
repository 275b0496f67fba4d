//! crates/portal_core/src/access.rs
//!
//! Ownership checks for teacher-side mutations.

use crate::domain::CourseId;
use crate::error::{CoreError, CoreResult};
use crate::ports::RecordStore;

/// Succeeds only if `teacher_id` is listed as a teacher of `course_id`.
pub async fn ensure_teaches(
    store: &dyn RecordStore,
    teacher_id: &str,
    course_id: CourseId,
) -> CoreResult<()> {
    let teachers = store.list_course_teachers(course_id).await?;
    if teachers.iter().any(|t| t == teacher_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "user {} does not teach course {}",
            teacher_id, course_id
        )))
    }
}
