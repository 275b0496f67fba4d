//! crates/portal_core/src/enrollment.rs
//!
//! The enrollment consistency guard. Decides which (student, course) pairs may
//! carry validations, submissions and progress, runs batch enrollment, and
//! filters out records that lost their backing enrollment.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::access::ensure_teaches;
use crate::domain::{
    Assignment, AssignmentId, Competency, CompetencyId, CompetencyValidation, CourseId, Enrollment,
    NewEnrollment, Submission,
};
use crate::error::{CoreError, CoreResult, IntegrityWarning};
use crate::ports::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Enrolled,
    AlreadyEnrolled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentResult {
    pub student_id: String,
    pub outcome: EnrollmentOutcome,
}

/// Records that survived an integrity filter, plus what was dropped and why.
#[derive(Debug, Clone)]
pub struct Audited<T> {
    pub records: Vec<T>,
    pub warnings: Vec<IntegrityWarning>,
}

#[derive(Clone)]
pub struct EnrollmentGuard {
    store: Arc<dyn RecordStore>,
}

impl EnrollmentGuard {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn is_enrolled(&self, student_id: &str, course_id: CourseId) -> CoreResult<bool> {
        Ok(self
            .store
            .find_enrollment(student_id, course_id)
            .await?
            .is_some())
    }

    pub async fn can_validate_competency(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> CoreResult<bool> {
        let competency = self.store.get_competency(competency_id).await?;
        self.is_enrolled(student_id, competency.course_id).await
    }

    pub async fn can_submit(&self, student_id: &str, assignment_id: AssignmentId) -> CoreResult<bool> {
        let assignment = self.store.get_assignment(assignment_id).await?;
        self.is_enrolled(student_id, assignment.course_id).await
    }

    /// Like [`Self::can_validate_competency`] but rejects with `NotEnrolled` and
    /// hands back the competency on success.
    pub async fn ensure_can_validate_competency(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> CoreResult<Competency> {
        let competency = self.store.get_competency(competency_id).await?;
        if !self.is_enrolled(student_id, competency.course_id).await? {
            return Err(CoreError::NotEnrolled {
                student_id: student_id.to_string(),
                course_id: competency.course_id,
            });
        }
        Ok(competency)
    }

    /// Like [`Self::can_submit`] but rejects with `NotEnrolled` and hands back
    /// the assignment on success.
    pub async fn ensure_can_submit(
        &self,
        student_id: &str,
        assignment_id: AssignmentId,
    ) -> CoreResult<Assignment> {
        let assignment = self.store.get_assignment(assignment_id).await?;
        if !self.is_enrolled(student_id, assignment.course_id).await? {
            return Err(CoreError::NotEnrolled {
                student_id: student_id.to_string(),
                course_id: assignment.course_id,
            });
        }
        Ok(assignment)
    }

    /// Enrolls every student in `student_ids` into `course_id`.
    ///
    /// Students already enrolled (or listed twice) are reported as
    /// `AlreadyEnrolled` instead of failing. The new rows go to the store as a
    /// single batch; a store failure fails the whole call.
    pub async fn enroll(
        &self,
        course_id: CourseId,
        student_ids: &[String],
    ) -> CoreResult<Vec<EnrollmentResult>> {
        let existing: HashSet<String> = self
            .store
            .list_enrollments_for_course(course_id)
            .await?
            .into_iter()
            .map(|e| e.student_id)
            .collect();

        let mut requested = HashSet::new();
        let mut to_insert = Vec::new();
        for student_id in student_ids {
            if !existing.contains(student_id) && requested.insert(student_id.clone()) {
                to_insert.push(NewEnrollment {
                    student_id: student_id.clone(),
                    course_id,
                });
            }
        }

        let inserted: HashSet<String> = if to_insert.is_empty() {
            HashSet::new()
        } else {
            self.store
                .insert_enrollments(to_insert)
                .await?
                .into_iter()
                .map(|e| e.student_id)
                .collect()
        };

        // A requested row missing from the insert result lost a race with a
        // concurrent enroll of the same pair; it is enrolled either way.
        let mut reported = HashSet::new();
        let results: Vec<EnrollmentResult> = student_ids
            .iter()
            .map(|student_id| {
                let outcome = if inserted.contains(student_id) && reported.insert(student_id) {
                    EnrollmentOutcome::Enrolled
                } else {
                    EnrollmentOutcome::AlreadyEnrolled
                };
                EnrollmentResult {
                    student_id: student_id.clone(),
                    outcome,
                }
            })
            .collect();

        info!(
            "Enrolled {} of {} requested student(s) into course {}",
            inserted.len(),
            student_ids.len(),
            course_id
        );
        Ok(results)
    }

    /// [`Self::enroll`] on behalf of a teacher of the course.
    pub async fn enroll_by_teacher(
        &self,
        teacher_id: &str,
        course_id: CourseId,
        student_ids: &[String],
    ) -> CoreResult<Vec<EnrollmentResult>> {
        ensure_teaches(self.store.as_ref(), teacher_id, course_id).await?;
        self.enroll(course_id, student_ids).await
    }

    /// Removes the enrollment. Validations and submissions the student made in
    /// the course stay in the store and are filtered out from then on.
    pub async fn unenroll(&self, course_id: CourseId, student_id: &str) -> CoreResult<()> {
        self.store.delete_enrollment(student_id, course_id).await?;
        info!("Unenrolled {} from course {}", student_id, course_id);
        Ok(())
    }

    pub async fn unenroll_by_teacher(
        &self,
        teacher_id: &str,
        course_id: CourseId,
        student_id: &str,
    ) -> CoreResult<()> {
        ensure_teaches(self.store.as_ref(), teacher_id, course_id).await?;
        self.unenroll(course_id, student_id).await
    }
}

//=========================================================================================
// Integrity Filters
//=========================================================================================

/// Keeps the validations whose competency is known and whose student is
/// enrolled in that competency's course.
///
/// `competencies` must cover every course the validations could belong to;
/// a validation of an unknown competency is treated as dangling.
pub fn retain_enrolled_validations(
    enrollments: &[Enrollment],
    competencies: &[Competency],
    validations: Vec<CompetencyValidation>,
) -> Audited<CompetencyValidation> {
    let enrolled = enrolled_pairs(enrollments);
    let course_of: HashMap<CompetencyId, CourseId> =
        competencies.iter().map(|c| (c.id, c.course_id)).collect();

    let mut records = Vec::with_capacity(validations.len());
    let mut warnings = Vec::new();
    for validation in validations {
        match course_of.get(&validation.competency_id) {
            None => warnings.push(IntegrityWarning::DanglingValidation {
                student_id: validation.student_id.clone(),
                competency_id: validation.competency_id,
            }),
            Some(course_id)
                if !enrolled.contains(&(validation.student_id.as_str(), *course_id)) =>
            {
                warnings.push(IntegrityWarning::OrphanedValidation {
                    student_id: validation.student_id.clone(),
                    competency_id: validation.competency_id,
                })
            }
            Some(_) => records.push(validation),
        }
    }
    log_warnings(&warnings);
    Audited { records, warnings }
}

/// Keeps the submissions whose student is enrolled in the assignment's course.
/// Submissions to assignments missing from `assignments` are dropped silently:
/// they are simply out of the caller's scope.
pub fn retain_enrolled_submissions(
    enrollments: &[Enrollment],
    assignments: &[Assignment],
    submissions: Vec<Submission>,
) -> Audited<Submission> {
    let enrolled = enrolled_pairs(enrollments);
    let course_of: HashMap<AssignmentId, CourseId> =
        assignments.iter().map(|a| (a.id, a.course_id)).collect();

    let mut records = Vec::with_capacity(submissions.len());
    let mut warnings = Vec::new();
    for submission in submissions {
        let Some(course_id) = course_of.get(&submission.assignment_id) else {
            continue;
        };
        if enrolled.contains(&(submission.student_id.as_str(), *course_id)) {
            records.push(submission);
        } else {
            warnings.push(IntegrityWarning::OrphanedSubmission {
                student_id: submission.student_id.clone(),
                submission_id: submission.id,
            });
        }
    }
    log_warnings(&warnings);
    Audited { records, warnings }
}

fn enrolled_pairs(enrollments: &[Enrollment]) -> HashSet<(&str, CourseId)> {
    enrollments
        .iter()
        .map(|e| (e.student_id.as_str(), e.course_id))
        .collect()
}

fn log_warnings(warnings: &[IntegrityWarning]) {
    for warning in warnings {
        warn!("Integrity warning: {}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewCompetency, Role};
    use crate::memory::MemoryStore;
    use chrono::Utc;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (MemoryStore, EnrollmentGuard, CourseId) {
        let store = MemoryStore::new();
        store.add_user("t1", Role::Teacher);
        store.add_user("s1", Role::Student);
        store.add_user("s2", Role::Student);
        let course = store.add_course("Algebra", &["t1"]);
        let guard = EnrollmentGuard::new(Arc::new(store.clone()));
        (store, guard, course.id)
    }

    #[tokio::test]
    async fn enroll_is_idempotent() {
        let (store, guard, course_id) = setup();

        let first = guard.enroll(course_id, &ids(&["s1"])).await.unwrap();
        assert_eq!(first[0].outcome, EnrollmentOutcome::Enrolled);

        let second = guard.enroll(course_id, &ids(&["s1"])).await.unwrap();
        assert_eq!(second[0].outcome, EnrollmentOutcome::AlreadyEnrolled);

        let rows = store.list_enrollments_for_course(course_id).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn enroll_reports_per_student_and_dedupes_the_batch() {
        let (_store, guard, course_id) = setup();
        guard.enroll(course_id, &ids(&["s1"])).await.unwrap();

        let results = guard
            .enroll(course_id, &ids(&["s1", "s2", "s2"]))
            .await
            .unwrap();
        let outcomes: Vec<_> = results.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                EnrollmentOutcome::AlreadyEnrolled,
                EnrollmentOutcome::Enrolled,
                EnrollmentOutcome::AlreadyEnrolled,
            ]
        );
    }

    #[tokio::test]
    async fn enroll_surfaces_store_failure() {
        let (store, guard, course_id) = setup();
        store.set_offline(true);
        let err = guard.enroll(course_id, &ids(&["s1"])).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(_)));
    }

    #[tokio::test]
    async fn only_course_teachers_may_enroll() {
        let (store, guard, course_id) = setup();
        store.add_user("t2", Role::Teacher);
        let err = guard
            .enroll_by_teacher("t2", course_id, &ids(&["s1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        guard
            .enroll_by_teacher("t1", course_id, &ids(&["s1"]))
            .await
            .unwrap();
        assert!(store.find_enrollment("s1", course_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn validation_requires_enrollment() {
        let (store, guard, course_id) = setup();
        let competency = store
            .insert_competency(NewCompetency {
                course_id,
                title: "Factoring".to_string(),
                description: None,
            })
            .await
            .unwrap();

        assert!(!guard.can_validate_competency("s1", competency.id).await.unwrap());
        let err = guard
            .ensure_can_validate_competency("s1", competency.id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::NotEnrolled {
                student_id: "s1".to_string(),
                course_id
            }
        );

        guard.enroll(course_id, &ids(&["s1"])).await.unwrap();
        assert!(guard.can_validate_competency("s1", competency.id).await.unwrap());

        guard.unenroll(course_id, "s1").await.unwrap();
        assert!(!guard.can_validate_competency("s1", competency.id).await.unwrap());
    }

    #[test]
    fn filters_orphaned_and_dangling_validations() {
        let now = Utc::now();
        let enrollments = vec![Enrollment {
            student_id: "s1".to_string(),
            course_id: 1,
            enrolled_at: now,
        }];
        let competencies = vec![
            Competency {
                id: 10,
                course_id: 1,
                title: "a".to_string(),
                description: None,
            },
            Competency {
                id: 20,
                course_id: 2,
                title: "b".to_string(),
                description: None,
            },
        ];
        let validation = |competency_id| CompetencyValidation {
            student_id: "s1".to_string(),
            competency_id,
            validated_at: now,
        };

        let audited = retain_enrolled_validations(
            &enrollments,
            &competencies,
            vec![validation(10), validation(20), validation(30)],
        );
        assert_eq!(audited.records.len(), 1);
        assert_eq!(audited.records[0].competency_id, 10);
        assert_eq!(audited.warnings.len(), 2);
        assert!(audited.warnings.contains(&IntegrityWarning::OrphanedValidation {
            student_id: "s1".to_string(),
            competency_id: 20
        }));
        assert!(audited.warnings.contains(&IntegrityWarning::DanglingValidation {
            student_id: "s1".to_string(),
            competency_id: 30
        }));
    }
}
