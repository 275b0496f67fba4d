//! crates/portal_core/src/progress.rs
//!
//! Completion percentage of a course for one student, derived from competency
//! validations. Nothing here is persisted.

use std::collections::HashSet;

use crate::domain::{Competency, CompetencyValidation, CourseId};

/// Derived progress of one student in one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    pub student_id: String,
    pub course_id: CourseId,
    pub validated: usize,
    pub total: usize,
    pub percentage: u8,
}

/// Returns the share of `competencies` validated in `validations`, as a whole
/// percentage rounded half up.
///
/// `competencies` is expected to be one course's set. `validations` may span
/// other courses; only ids present in `competencies` count, so validations of
/// deleted competencies are ignored. An empty competency set yields 0.
pub fn compute_progress(competencies: &[Competency], validations: &[CompetencyValidation]) -> u8 {
    let (validated, total) = count_validated(competencies, validations);
    percentage(validated, total)
}

/// Same as [`compute_progress`] but keeps the counts around for display.
pub fn course_progress(
    student_id: &str,
    course_id: CourseId,
    competencies: &[Competency],
    validations: &[CompetencyValidation],
) -> CourseProgress {
    let in_course: Vec<Competency> = competencies
        .iter()
        .filter(|c| c.course_id == course_id)
        .cloned()
        .collect();
    let own: Vec<CompetencyValidation> = validations
        .iter()
        .filter(|v| v.student_id == student_id)
        .cloned()
        .collect();
    let (validated, total) = count_validated(&in_course, &own);

    CourseProgress {
        student_id: student_id.to_string(),
        course_id,
        validated,
        total,
        percentage: percentage(validated, total),
    }
}

fn count_validated(
    competencies: &[Competency],
    validations: &[CompetencyValidation],
) -> (usize, usize) {
    let ids: HashSet<_> = competencies.iter().map(|c| c.id).collect();
    let validated: HashSet<_> = validations
        .iter()
        .map(|v| v.competency_id)
        .filter(|id| ids.contains(id))
        .collect();
    (validated.len(), ids.len())
}

fn percentage(validated: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // Integer form of round(100 * validated / total); validated <= total keeps it <= 100.
    ((200 * validated + total) / (2 * total)) as u8
}
