//! crates/portal_core/src/memory.rs
//!
//! An in-process `RecordStore`. Backs the test suites and any embedding that
//! does not want a database. Mirrors the uniqueness rules of the SQL schema.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::*;
use crate::ports::{RecordStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Data {
    users: Vec<User>,
    courses: Vec<Course>,
    course_teachers: Vec<(CourseId, UserId)>,
    enrollments: Vec<Enrollment>,
    competencies: Vec<Competency>,
    validations: Vec<CompetencyValidation>,
    assignments: Vec<Assignment>,
    submissions: Vec<Submission>,
    materials: Vec<Material>,
    last_id: i64,
    offline: bool,
}

impl Data {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    conn: Arc<Mutex<Data>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Data> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the data for a port call, failing like a dropped connection when offline.
    fn data(&self) -> StoreResult<MutexGuard<'_, Data>> {
        let data = self.lock();
        if data.offline {
            return Err(StoreError::Unexpected("store is unreachable".to_string()));
        }
        Ok(data)
    }

    /// Makes every subsequent port call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    // --- Seeding (users and courses are owned outside the core) ---

    pub fn add_user(&self, id: &str, role: Role) -> User {
        let user = User {
            id: id.to_string(),
            email: format!("{}@example.org", id),
            full_name: None,
            role,
            created_at: Utc::now(),
        };
        self.lock().users.push(user.clone());
        user
    }

    pub fn add_course(&self, title: &str, teacher_ids: &[&str]) -> Course {
        let mut data = self.lock();
        let course = Course {
            id: data.next_id(),
            title: title.to_string(),
            description: None,
        };
        data.courses.push(course.clone());
        for teacher_id in teacher_ids {
            data.course_teachers
                .push((course.id, teacher_id.to_string()));
        }
        course
    }

    pub fn add_material(&self, course_id: CourseId, title: &str, file_url: &str) -> Material {
        let mut data = self.lock();
        let material = Material {
            id: data.next_id(),
            course_id,
            title: title.to_string(),
            description: None,
            file_url: file_url.to_string(),
        };
        data.materials.push(material.clone());
        material
    }

    /// Writes a validation row without any enrollment check, as a stale or
    /// foreign writer could.
    pub fn force_validation(&self, student_id: &str, competency_id: CompetencyId) {
        self.lock().validations.push(CompetencyValidation {
            student_id: student_id.to_string(),
            competency_id,
            validated_at: Utc::now(),
        });
    }

    /// Writes a submission row bypassing admission and uniqueness checks.
    pub fn force_submission(&self, row: NewSubmission) -> Submission {
        let mut data = self.lock();
        let submission = Submission {
            id: data.next_id(),
            assignment_id: row.assignment_id,
            student_id: row.student_id,
            attempt_number: row.attempt_number,
            content: row.content,
            score: None,
            feedback: None,
            graded_by: None,
            submitted_at: Some(row.submitted_at),
            evaluated_at: None,
            created_at: Utc::now(),
        };
        data.submissions.push(submission.clone());
        submission
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> StoreResult<User> {
        let data = self.data()?;
        data.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.data()?.users.clone())
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let data = self.data()?;
        Ok(data.users.iter().filter(|u| u.role == role).cloned().collect())
    }

    async fn get_course(&self, course_id: CourseId) -> StoreResult<Course> {
        let data = self.data()?;
        data.courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| not_found("Course", course_id))
    }

    async fn list_courses(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Course>> {
        let data = self.data()?;
        Ok(data
            .courses
            .iter()
            .filter(|c| course_ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn list_courses_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Course>> {
        let data = self.data()?;
        Ok(data
            .courses
            .iter()
            .filter(|c| {
                data.course_teachers
                    .iter()
                    .any(|(course_id, t)| *course_id == c.id && t == teacher_id)
            })
            .cloned()
            .collect())
    }

    async fn list_course_teachers(&self, course_id: CourseId) -> StoreResult<Vec<String>> {
        let data = self.data()?;
        Ok(data
            .course_teachers
            .iter()
            .filter(|(c, _)| *c == course_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn insert_course(&self, row: NewCourse, teacher_id: &str) -> StoreResult<Course> {
        let mut data = self.data()?;
        let course = Course {
            id: data.next_id(),
            title: row.title,
            description: row.description,
        };
        data.courses.push(course.clone());
        data.course_teachers
            .push((course.id, teacher_id.to_string()));
        Ok(course)
    }

    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: CourseId,
    ) -> StoreResult<Option<Enrollment>> {
        let data = self.data()?;
        Ok(data
            .enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn list_enrollments_for_course(
        &self,
        course_id: CourseId,
    ) -> StoreResult<Vec<Enrollment>> {
        let data = self.data()?;
        Ok(data
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn list_enrollments_for_student(&self, student_id: &str) -> StoreResult<Vec<Enrollment>> {
        let data = self.data()?;
        Ok(data
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn insert_enrollments(&self, rows: Vec<NewEnrollment>) -> StoreResult<Vec<Enrollment>> {
        let mut data = self.data()?;
        if let Some(row) = rows
            .iter()
            .find(|r| !data.courses.iter().any(|c| c.id == r.course_id))
        {
            return Err(not_found("Course", row.course_id));
        }

        let now = Utc::now();
        let mut inserted = Vec::new();
        for row in rows {
            let exists = data
                .enrollments
                .iter()
                .any(|e| e.student_id == row.student_id && e.course_id == row.course_id);
            if exists {
                continue;
            }
            let enrollment = Enrollment {
                student_id: row.student_id,
                course_id: row.course_id,
                enrolled_at: now,
            };
            data.enrollments.push(enrollment.clone());
            inserted.push(enrollment);
        }
        Ok(inserted)
    }

    async fn delete_enrollment(&self, student_id: &str, course_id: CourseId) -> StoreResult<()> {
        let mut data = self.data()?;
        let before = data.enrollments.len();
        data.enrollments
            .retain(|e| !(e.student_id == student_id && e.course_id == course_id));
        if data.enrollments.len() == before {
            return Err(not_found(
                "Enrollment",
                format!("({}, {})", student_id, course_id),
            ));
        }
        Ok(())
    }

    async fn get_competency(&self, competency_id: CompetencyId) -> StoreResult<Competency> {
        let data = self.data()?;
        data.competencies
            .iter()
            .find(|c| c.id == competency_id)
            .cloned()
            .ok_or_else(|| not_found("Competency", competency_id))
    }

    async fn list_competencies(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Competency>> {
        let data = self.data()?;
        Ok(data
            .competencies
            .iter()
            .filter(|c| course_ids.contains(&c.course_id))
            .cloned()
            .collect())
    }

    async fn insert_competency(&self, row: NewCompetency) -> StoreResult<Competency> {
        let mut data = self.data()?;
        let competency = Competency {
            id: data.next_id(),
            course_id: row.course_id,
            title: row.title,
            description: row.description,
        };
        data.competencies.push(competency.clone());
        Ok(competency)
    }

    async fn update_competency(
        &self,
        competency_id: CompetencyId,
        patch: CompetencyPatch,
    ) -> StoreResult<Competency> {
        let mut data = self.data()?;
        let competency = data
            .competencies
            .iter_mut()
            .find(|c| c.id == competency_id)
            .ok_or_else(|| not_found("Competency", competency_id))?;
        if let Some(title) = patch.title {
            competency.title = title;
        }
        if let Some(description) = patch.description {
            competency.description = Some(description);
        }
        Ok(competency.clone())
    }

    async fn delete_competency(&self, competency_id: CompetencyId) -> StoreResult<()> {
        let mut data = self.data()?;
        let before = data.competencies.len();
        data.competencies.retain(|c| c.id != competency_id);
        if data.competencies.len() == before {
            return Err(not_found("Competency", competency_id));
        }
        Ok(())
    }

    async fn find_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<Option<CompetencyValidation>> {
        let data = self.data()?;
        Ok(data
            .validations
            .iter()
            .find(|v| v.student_id == student_id && v.competency_id == competency_id)
            .cloned())
    }

    async fn list_validations_for_student(
        &self,
        student_id: &str,
    ) -> StoreResult<Vec<CompetencyValidation>> {
        let data = self.data()?;
        Ok(data
            .validations
            .iter()
            .filter(|v| v.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn insert_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<CompetencyValidation> {
        let mut data = self.data()?;
        let exists = data
            .validations
            .iter()
            .any(|v| v.student_id == student_id && v.competency_id == competency_id);
        if exists {
            return Err(StoreError::Conflict(format!(
                "competency {} already validated by {}",
                competency_id, student_id
            )));
        }
        let validation = CompetencyValidation {
            student_id: student_id.to_string(),
            competency_id,
            validated_at: Utc::now(),
        };
        data.validations.push(validation.clone());
        Ok(validation)
    }

    async fn delete_validation(
        &self,
        student_id: &str,
        competency_id: CompetencyId,
    ) -> StoreResult<()> {
        let mut data = self.data()?;
        data.validations
            .retain(|v| !(v.student_id == student_id && v.competency_id == competency_id));
        Ok(())
    }

    async fn get_assignment(&self, assignment_id: AssignmentId) -> StoreResult<Assignment> {
        let data = self.data()?;
        data.assignments
            .iter()
            .find(|a| a.id == assignment_id)
            .cloned()
            .ok_or_else(|| not_found("Assignment", assignment_id))
    }

    async fn list_assignments(&self, course_ids: &[CourseId]) -> StoreResult<Vec<Assignment>> {
        let data = self.data()?;
        Ok(data
            .assignments
            .iter()
            .filter(|a| course_ids.contains(&a.course_id))
            .cloned()
            .collect())
    }

    async fn insert_assignment(&self, row: NewAssignment) -> StoreResult<Assignment> {
        let mut data = self.data()?;
        let assignment = Assignment {
            id: data.next_id(),
            course_id: row.course_id,
            title: row.title,
            description: row.description,
            kind: row.kind,
            start_date: row.start_date,
            end_date: row.end_date,
            max_attempts: row.max_attempts,
        };
        data.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        assignment_id: AssignmentId,
        patch: AssignmentPatch,
    ) -> StoreResult<Assignment> {
        let mut data = self.data()?;
        let assignment = data
            .assignments
            .iter_mut()
            .find(|a| a.id == assignment_id)
            .ok_or_else(|| not_found("Assignment", assignment_id))?;
        if let Some(title) = patch.title {
            assignment.title = title;
        }
        if let Some(description) = patch.description {
            assignment.description = Some(description);
        }
        if let Some(kind) = patch.kind {
            assignment.kind = kind;
        }
        if let Some(start_date) = patch.start_date {
            assignment.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            assignment.end_date = end_date;
        }
        if let Some(max_attempts) = patch.max_attempts {
            assignment.max_attempts = max_attempts;
        }
        Ok(assignment.clone())
    }

    async fn get_submission(&self, submission_id: SubmissionId) -> StoreResult<Submission> {
        let data = self.data()?;
        data.submissions
            .iter()
            .find(|s| s.id == submission_id)
            .cloned()
            .ok_or_else(|| not_found("Submission", submission_id))
    }

    async fn list_submissions(&self, filter: SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let data = self.data()?;
        Ok(data
            .submissions
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn insert_submission(&self, row: NewSubmission) -> StoreResult<Submission> {
        let mut data = self.data()?;
        let taken = data.submissions.iter().any(|s| {
            s.assignment_id == row.assignment_id
                && s.student_id == row.student_id
                && s.attempt_number == row.attempt_number
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "attempt {} of assignment {} already exists for {}",
                row.attempt_number, row.assignment_id, row.student_id
            )));
        }
        let submission = Submission {
            id: data.next_id(),
            assignment_id: row.assignment_id,
            student_id: row.student_id,
            attempt_number: row.attempt_number,
            content: row.content,
            score: None,
            feedback: None,
            graded_by: None,
            submitted_at: Some(row.submitted_at),
            evaluated_at: None,
            created_at: Utc::now(),
        };
        data.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn update_submission(
        &self,
        submission_id: SubmissionId,
        patch: SubmissionPatch,
    ) -> StoreResult<Submission> {
        let mut data = self.data()?;
        let submission = data
            .submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(|| not_found("Submission", submission_id))?;
        if patch.score.is_some() {
            submission.score = patch.score;
        }
        if patch.feedback.is_some() {
            submission.feedback = patch.feedback;
        }
        if patch.graded_by.is_some() {
            submission.graded_by = patch.graded_by;
        }
        if patch.evaluated_at.is_some() {
            submission.evaluated_at = patch.evaluated_at;
        }
        Ok(submission.clone())
    }

    async fn get_material(&self, material_id: MaterialId) -> StoreResult<Material> {
        let data = self.data()?;
        data.materials
            .iter()
            .find(|m| m.id == material_id)
            .cloned()
            .ok_or_else(|| not_found("Material", material_id))
    }

    async fn list_materials(&self, course_id: CourseId) -> StoreResult<Vec<Material>> {
        let data = self.data()?;
        Ok(data
            .materials
            .iter()
            .filter(|m| m.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn insert_material(&self, row: NewMaterial) -> StoreResult<Material> {
        let mut data = self.data()?;
        if !data.courses.iter().any(|c| c.id == row.course_id) {
            return Err(not_found("Course", row.course_id));
        }
        let material = Material {
            id: data.next_id(),
            course_id: row.course_id,
            title: row.title,
            description: row.description,
            file_url: row.file_url,
        };
        data.materials.push(material.clone());
        Ok(material)
    }

    async fn update_material(
        &self,
        material_id: MaterialId,
        patch: MaterialPatch,
    ) -> StoreResult<Material> {
        let mut data = self.data()?;
        let material = data
            .materials
            .iter_mut()
            .find(|m| m.id == material_id)
            .ok_or_else(|| not_found("Material", material_id))?;
        if let Some(title) = patch.title {
            material.title = title;
        }
        if let Some(description) = patch.description {
            material.description = Some(description);
        }
        if let Some(file_url) = patch.file_url {
            material.file_url = file_url;
        }
        Ok(material.clone())
    }

    async fn delete_material(&self, material_id: MaterialId) -> StoreResult<()> {
        let mut data = self.data()?;
        let before = data.materials.len();
        data.materials.retain(|m| m.id != material_id);
        if data.materials.len() == before {
            return Err(not_found("Material", material_id));
        }
        Ok(())
    }
}
