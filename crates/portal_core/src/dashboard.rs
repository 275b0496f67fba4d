//! crates/portal_core/src/dashboard.rs
//!
//! Composition root for the per-role views. Loads the entities a user may
//! see, runs them through the enrollment guard's filters and derives progress
//! and status. Every call reads fresh from the store.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use futures::TryFutureExt;

use crate::domain::{
    Assignment, Competency, CompetencyValidation, Course, CourseId, Enrollment, Material, Role,
    Submission, SubmissionFilter, User,
};
use crate::enrollment::{retain_enrolled_submissions, retain_enrolled_validations};
use crate::error::{CoreError, CoreResult, IntegrityWarning};
use crate::evaluation::EvaluationMutator;
use crate::ports::{RecordStore, StoreError};
use crate::progress::{course_progress, CourseProgress};
use crate::status::{resolve_status, StatusResolution};

//=========================================================================================
// View Models
//=========================================================================================

#[derive(Debug, Clone)]
pub struct StudentCourse {
    pub course: Course,
    pub progress: CourseProgress,
}

#[derive(Debug, Clone)]
pub struct AssignmentView {
    pub assignment: Assignment,
    pub course_title: String,
    pub resolution: StatusResolution,
}

#[derive(Debug, Clone)]
pub struct StudentDashboard {
    pub student: User,
    pub courses: Vec<StudentCourse>,
    /// Sorted by due date; assignments without one come last.
    pub assignments: Vec<AssignmentView>,
    pub warnings: Vec<IntegrityWarning>,
}

#[derive(Debug, Clone)]
pub struct TeacherCourse {
    pub course: Course,
    pub competencies: Vec<Competency>,
    pub assignments: Vec<Assignment>,
    pub materials: Vec<Material>,
    pub students: Vec<CourseProgress>,
}

#[derive(Debug, Clone)]
pub struct TeacherDashboard {
    pub teacher: User,
    pub courses: Vec<TeacherCourse>,
    pub pending_evaluations: Vec<Submission>,
}

#[derive(Debug, Clone)]
pub struct AdminDashboard {
    pub admin: User,
    pub total_users: usize,
    pub users_by_role: BTreeMap<Role, usize>,
}

#[derive(Debug, Clone)]
pub enum Dashboard {
    Student(StudentDashboard),
    Teacher(TeacherDashboard),
    Admin(AdminDashboard),
}

//=========================================================================================
// Aggregator
//=========================================================================================

#[derive(Clone)]
pub struct DashboardAggregator {
    store: Arc<dyn RecordStore>,
    evaluations: EvaluationMutator,
}

impl DashboardAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let evaluations = EvaluationMutator::new(store.clone());
        Self { store, evaluations }
    }

    pub async fn for_user(&self, user_id: &str) -> CoreResult<Dashboard> {
        let user = self.store.get_user(user_id).await?;
        Ok(match user.role {
            Role::Student => Dashboard::Student(self.student_dashboard(user).await?),
            Role::Teacher => Dashboard::Teacher(self.teacher_dashboard(user).await?),
            Role::Admin => Dashboard::Admin(self.admin_dashboard(user).await?),
        })
    }

    /// Progress of one student in one course. Fails with `NotEnrolled` when
    /// the pair has no enrollment.
    pub async fn student_progress(
        &self,
        student_id: &str,
        course_id: CourseId,
    ) -> CoreResult<CourseProgress> {
        if self
            .store
            .find_enrollment(student_id, course_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotEnrolled {
                student_id: student_id.to_string(),
                course_id,
            });
        }
        let course_ids = [course_id];
        let (competencies, validations) = futures::try_join!(
            self.store.list_competencies(&course_ids),
            self.store.list_validations_for_student(student_id),
        )?;
        Ok(course_progress(
            student_id,
            course_id,
            &competencies,
            &validations,
        ))
    }

    pub async fn student_dashboard(&self, student: User) -> CoreResult<StudentDashboard> {
        let enrollments = self.store.list_enrollments_for_student(&student.id).await?;
        let course_ids: Vec<CourseId> = enrollments.iter().map(|e| e.course_id).collect();

        let (courses, mut competencies, mut assignments, validations, submissions) = futures::try_join!(
            self.store.list_courses(&course_ids),
            self.store.list_competencies(&course_ids),
            self.store.list_assignments(&course_ids),
            self.store.list_validations_for_student(&student.id),
            self.store.list_submissions(SubmissionFilter {
                student_id: Some(student.id.clone()),
                ..Default::default()
            }),
        )?;

        // Records pointing outside the enrolled courses are looked up so the
        // filters can tell an unenrolled course from a deleted row.
        let extra_competencies = self.foreign_competencies(&competencies, &validations).await?;
        competencies.extend(extra_competencies);
        let extra_assignments = self.foreign_assignments(&assignments, &submissions).await?;
        assignments.extend(extra_assignments);

        let validations = retain_enrolled_validations(&enrollments, &competencies, validations);
        let submissions = retain_enrolled_submissions(&enrollments, &assignments, submissions);

        let student_courses = courses
            .into_iter()
            .map(|course| StudentCourse {
                progress: course_progress(
                    &student.id,
                    course.id,
                    &competencies,
                    &validations.records,
                ),
                course,
            })
            .collect::<Vec<_>>();

        let mut views: Vec<AssignmentView> = assignments
            .into_iter()
            .filter(|a| course_ids.contains(&a.course_id))
            .map(|assignment| {
                let course_title = student_courses
                    .iter()
                    .find(|c| c.course.id == assignment.course_id)
                    .map(|c| c.course.title.clone())
                    .unwrap_or_default();
                AssignmentView {
                    resolution: resolve_status(&assignment, &submissions.records),
                    course_title,
                    assignment,
                }
            })
            .collect();
        views.sort_by_key(|v| {
            (
                v.assignment.end_date.is_none(),
                v.assignment.end_date,
                v.assignment.id,
            )
        });

        let mut warnings = validations.warnings;
        warnings.extend(submissions.warnings);

        Ok(StudentDashboard {
            student,
            courses: student_courses,
            assignments: views,
            warnings,
        })
    }

    pub async fn teacher_dashboard(&self, teacher: User) -> CoreResult<TeacherDashboard> {
        let courses = self.store.list_courses_for_teacher(&teacher.id).await?;
        let course_ids: Vec<CourseId> = courses.iter().map(|c| c.id).collect();

        let (competencies, assignments, pending_evaluations) = futures::try_join!(
            self.store.list_competencies(&course_ids).err_into::<CoreError>(),
            self.store.list_assignments(&course_ids).err_into::<CoreError>(),
            self.evaluations.pending_evaluations(&teacher.id),
        )?;

        let courses = try_join_all(courses.into_iter().map(|course| {
            let competencies: Vec<Competency> = competencies
                .iter()
                .filter(|c| c.course_id == course.id)
                .cloned()
                .collect();
            let assignments: Vec<Assignment> = assignments
                .iter()
                .filter(|a| a.course_id == course.id)
                .cloned()
                .collect();
            self.teacher_course(course, competencies, assignments)
        }))
        .await?;

        Ok(TeacherDashboard {
            teacher,
            courses,
            pending_evaluations,
        })
    }

    async fn teacher_course(
        &self,
        course: Course,
        competencies: Vec<Competency>,
        assignments: Vec<Assignment>,
    ) -> CoreResult<TeacherCourse> {
        let (materials, enrollments) = futures::try_join!(
            self.store.list_materials(course.id),
            self.store.list_enrollments_for_course(course.id),
        )?;

        let students = try_join_all(enrollments.iter().map(|enrollment: &Enrollment| {
            let competencies = &competencies;
            async move {
                let validations = self
                    .store
                    .list_validations_for_student(&enrollment.student_id)
                    .await?;
                Ok::<_, CoreError>(course_progress(
                    &enrollment.student_id,
                    enrollment.course_id,
                    competencies,
                    &validations,
                ))
            }
        }))
        .await?;

        Ok(TeacherCourse {
            course,
            competencies,
            assignments,
            materials,
            students,
        })
    }

    pub async fn admin_dashboard(&self, admin: User) -> CoreResult<AdminDashboard> {
        let (students, teachers, admins) = futures::try_join!(
            self.store.list_users_by_role(Role::Student),
            self.store.list_users_by_role(Role::Teacher),
            self.store.list_users_by_role(Role::Admin),
        )?;
        let users_by_role = BTreeMap::from([
            (Role::Student, students.len()),
            (Role::Teacher, teachers.len()),
            (Role::Admin, admins.len()),
        ]);
        Ok(AdminDashboard {
            admin,
            total_users: users_by_role.values().sum(),
            users_by_role,
        })
    }

    async fn foreign_competencies(
        &self,
        known: &[Competency],
        validations: &[CompetencyValidation],
    ) -> CoreResult<Vec<Competency>> {
        let known: HashSet<_> = known.iter().map(|c| c.id).collect();
        let unknown: HashSet<_> = validations
            .iter()
            .map(|v| v.competency_id)
            .filter(|id| !known.contains(id))
            .collect();
        let mut found = Vec::new();
        for id in unknown {
            match self.store.get_competency(id).await {
                Ok(competency) => found.push(competency),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(found)
    }

    async fn foreign_assignments(
        &self,
        known: &[Assignment],
        submissions: &[Submission],
    ) -> CoreResult<Vec<Assignment>> {
        let known: HashSet<_> = known.iter().map(|a| a.id).collect();
        let unknown: HashSet<_> = submissions
            .iter()
            .map(|s| s.assignment_id)
            .filter(|id| !known.contains(id))
            .collect();
        let mut found = Vec::new();
        for id in unknown {
            match self.store.get_assignment(id).await {
                Ok(assignment) => found.push(assignment),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewCompetency, NewEnrollment};
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn admin_counts_users_by_role() {
        let store = MemoryStore::new();
        store.add_user("a1", Role::Admin);
        store.add_user("t1", Role::Teacher);
        store.add_user("s1", Role::Student);
        store.add_user("s2", Role::Student);
        let aggregator = DashboardAggregator::new(Arc::new(store));

        let Dashboard::Admin(view) = aggregator.for_user("a1").await.unwrap() else {
            panic!("expected admin dashboard");
        };
        assert_eq!(view.total_users, 4);
        assert_eq!(view.users_by_role[&Role::Student], 2);
        assert_eq!(view.users_by_role[&Role::Teacher], 1);
        assert_eq!(view.users_by_role[&Role::Admin], 1);
    }

    #[tokio::test]
    async fn student_progress_requires_enrollment() {
        let store = MemoryStore::new();
        store.add_user("s1", Role::Student);
        let course = store.add_course("Art", &[]);
        let aggregator = DashboardAggregator::new(Arc::new(store));
        let err = aggregator.student_progress("s1", course.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotEnrolled { .. }));
    }

    #[tokio::test]
    async fn student_progress_counts_validated_competencies() {
        let store = MemoryStore::new();
        store.add_user("s1", Role::Student);
        let course = store.add_course("Art", &[]);
        store
            .insert_enrollments(vec![NewEnrollment {
                student_id: "s1".to_string(),
                course_id: course.id,
            }])
            .await
            .unwrap();
        let mut ids = Vec::new();
        for title in ["Shading", "Perspective", "Color"] {
            let competency = store
                .insert_competency(NewCompetency {
                    course_id: course.id,
                    title: title.to_string(),
                    description: None,
                })
                .await
                .unwrap();
            ids.push(competency.id);
        }
        store.insert_validation("s1", ids[0]).await.unwrap();

        let aggregator = DashboardAggregator::new(Arc::new(store));
        let progress = aggregator.student_progress("s1", course.id).await.unwrap();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.validated, 1);
        assert_eq!(progress.percentage, 33);
    }

    #[tokio::test]
    async fn validation_in_unenrolled_course_is_flagged() {
        let store = MemoryStore::new();
        store.add_user("s1", Role::Student);
        let enrolled = store.add_course("Art", &[]);
        let other = store.add_course("Music", &[]);
        store
            .insert_enrollments(vec![NewEnrollment {
                student_id: "s1".to_string(),
                course_id: enrolled.id,
            }])
            .await
            .unwrap();
        let foreign = store
            .insert_competency(NewCompetency {
                course_id: other.id,
                title: "Scales".to_string(),
                description: None,
            })
            .await
            .unwrap();
        store.force_validation("s1", foreign.id);

        let aggregator = DashboardAggregator::new(Arc::new(store));
        let Dashboard::Student(view) = aggregator.for_user("s1").await.unwrap() else {
            panic!("expected student dashboard");
        };
        assert_eq!(
            view.warnings,
            vec![IntegrityWarning::OrphanedValidation {
                student_id: "s1".to_string(),
                competency_id: foreign.id
            }]
        );
        assert_eq!(view.courses.len(), 1);
        assert_eq!(view.courses[0].progress.percentage, 0);
    }
}
