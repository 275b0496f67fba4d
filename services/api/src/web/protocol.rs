//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server. Core domain types carry no serialization concerns, so every payload
//! here is built from them through a `From` impl.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use portal_core::dashboard::{
    AdminDashboard, AssignmentView, Dashboard, StudentCourse, StudentDashboard, TeacherCourse,
    TeacherDashboard,
};
use portal_core::domain::{
    Assignment, AssignmentPatch, Competency, CompetencyPatch, Course, Material, MaterialPatch,
    NewCourse, Submission, User,
};
use portal_core::enrollment::{EnrollmentOutcome, EnrollmentResult};
use portal_core::evaluation::Evaluation;
use portal_core::progress::CourseProgress;
use portal_core::status::StatusResolution;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Payloads Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct EnrollRequest {
    pub student_ids: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SubmitRequest {
    pub content: String,
}

/// One evaluation edit. The client sends grade and feedback independently as
/// the teacher types; a missing field keeps its stored value.
#[derive(Deserialize, Debug, ToSchema)]
pub struct EvaluationRequest {
    #[schema(minimum = 0, maximum = 100)]
    pub grade: Option<f64>,
    pub feedback: Option<String>,
}

impl From<EvaluationRequest> for Evaluation {
    fn from(req: EvaluationRequest) -> Self {
        Evaluation {
            grade: req.grade,
            feedback: req.feedback,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct NewCourseRequest {
    pub title: String,
    pub description: Option<String>,
}

impl From<NewCourseRequest> for NewCourse {
    fn from(req: NewCourseRequest) -> Self {
        NewCourse {
            title: req.title,
            description: req.description,
        }
    }
}

/// Metadata of an already uploaded file.
#[derive(Deserialize, Debug, ToSchema)]
pub struct NewMaterialRequest {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct MaterialPatchRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
}

impl From<MaterialPatchRequest> for MaterialPatch {
    fn from(req: MaterialPatchRequest) -> Self {
        MaterialPatch {
            title: req.title,
            description: req.description,
            file_url: req.file_url,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct NewCompetencyRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CompetencyPatchRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<CompetencyPatchRequest> for CompetencyPatch {
    fn from(req: CompetencyPatchRequest) -> Self {
        CompetencyPatch {
            title: req.title,
            description: req.description,
        }
    }
}

fn default_kind() -> String {
    "assignment".to_string()
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct NewAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    /// Free-form kind such as "assignment" or "quiz".
    #[serde(default = "default_kind", rename = "type")]
    pub kind: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

/// Keeps an explicit `null` apart from a missing key: missing is `None`,
/// `null` is `Some(None)`.
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Missing keys keep their stored value. Sending `null` for `start_date`,
/// `end_date` or `max_attempts` removes it.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct AssignmentPatchRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<u32>)]
    pub max_attempts: Option<Option<u32>>,
}

impl From<AssignmentPatchRequest> for AssignmentPatch {
    fn from(req: AssignmentPatchRequest) -> Self {
        AssignmentPatch {
            title: req.title,
            description: req.description,
            kind: req.kind,
            start_date: req.start_date,
            end_date: req.end_date,
            max_attempts: req.max_attempts,
        }
    }
}

/// Query for `GET /courses/{id}/progress`. Teachers of the course may ask for
/// any enrolled student; everyone else gets their own progress.
#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    pub student_id: Option<String>,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    #[schema(example = "student")]
    pub role: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            role: user.role.as_str().to_string(),
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CourseDto {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
}

impl From<Course> for CourseDto {
    fn from(course: Course) -> Self {
        CourseDto {
            id: course.id,
            title: course.title,
            description: course.description,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CompetencyDto {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
}

impl From<Competency> for CompetencyDto {
    fn from(c: Competency) -> Self {
        CompetencyDto {
            id: c.id,
            course_id: c.course_id,
            title: c.title,
            description: c.description,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AssignmentDto {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

impl From<Assignment> for AssignmentDto {
    fn from(a: Assignment) -> Self {
        AssignmentDto {
            id: a.id,
            course_id: a.course_id,
            title: a.title,
            description: a.description,
            kind: a.kind,
            start_date: a.start_date,
            end_date: a.end_date,
            max_attempts: a.max_attempts,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SubmissionDto {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: String,
    pub attempt_number: u32,
    pub content: String,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl From<Submission> for SubmissionDto {
    fn from(s: Submission) -> Self {
        SubmissionDto {
            id: s.id,
            assignment_id: s.assignment_id,
            student_id: s.student_id,
            attempt_number: s.attempt_number,
            content: s.content,
            score: s.score,
            feedback: s.feedback,
            graded_by: s.graded_by,
            submitted_at: s.submitted_at,
            evaluated_at: s.evaluated_at,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct MaterialDto {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
}

impl From<Material> for MaterialDto {
    fn from(m: Material) -> Self {
        MaterialDto {
            id: m.id,
            course_id: m.course_id,
            title: m.title,
            description: m.description,
            file_url: m.file_url,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProgressDto {
    pub student_id: String,
    pub course_id: i64,
    pub validated: usize,
    pub total: usize,
    #[schema(minimum = 0, maximum = 100)]
    pub percentage: u8,
}

impl From<CourseProgress> for ProgressDto {
    fn from(p: CourseProgress) -> Self {
        ProgressDto {
            student_id: p.student_id,
            course_id: p.course_id,
            validated: p.validated,
            total: p.total,
            percentage: p.percentage,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct StatusDto {
    #[schema(example = "submitted")]
    pub status: String,
    pub late: bool,
    pub latest_submission: Option<SubmissionDto>,
}

impl From<StatusResolution> for StatusDto {
    fn from(r: StatusResolution) -> Self {
        StatusDto {
            status: r.status.as_str().to_string(),
            late: r.late,
            latest_submission: r.latest_submission.map(SubmissionDto::from),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ValidationDto {
    pub competency_id: i64,
    pub validated: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct EnrollmentResultDto {
    pub student_id: String,
    /// `enrolled` or `already_enrolled`.
    pub outcome: String,
}

impl From<EnrollmentResult> for EnrollmentResultDto {
    fn from(r: EnrollmentResult) -> Self {
        let outcome = match r.outcome {
            EnrollmentOutcome::Enrolled => "enrolled",
            EnrollmentOutcome::AlreadyEnrolled => "already_enrolled",
        };
        EnrollmentResultDto {
            student_id: r.student_id,
            outcome: outcome.to_string(),
        }
    }
}

// --- Dashboards ---

#[derive(Serialize, Debug, ToSchema)]
pub struct StudentCourseDto {
    pub course: CourseDto,
    pub progress: ProgressDto,
}

impl From<StudentCourse> for StudentCourseDto {
    fn from(c: StudentCourse) -> Self {
        StudentCourseDto {
            course: c.course.into(),
            progress: c.progress.into(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AssignmentViewDto {
    pub assignment: AssignmentDto,
    pub course_title: String,
    pub status: StatusDto,
}

impl From<AssignmentView> for AssignmentViewDto {
    fn from(v: AssignmentView) -> Self {
        AssignmentViewDto {
            assignment: v.assignment.into(),
            course_title: v.course_title,
            status: v.resolution.into(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct StudentDashboardDto {
    pub user: UserDto,
    pub courses: Vec<StudentCourseDto>,
    pub assignments: Vec<AssignmentViewDto>,
    /// Human-readable integrity warnings about records that were left out.
    pub warnings: Vec<String>,
}

impl From<StudentDashboard> for StudentDashboardDto {
    fn from(d: StudentDashboard) -> Self {
        StudentDashboardDto {
            user: d.student.into(),
            courses: d.courses.into_iter().map(Into::into).collect(),
            assignments: d.assignments.into_iter().map(Into::into).collect(),
            warnings: d.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TeacherCourseDto {
    pub course: CourseDto,
    pub competencies: Vec<CompetencyDto>,
    pub assignments: Vec<AssignmentDto>,
    pub materials: Vec<MaterialDto>,
    pub students: Vec<ProgressDto>,
}

impl From<TeacherCourse> for TeacherCourseDto {
    fn from(c: TeacherCourse) -> Self {
        TeacherCourseDto {
            course: c.course.into(),
            competencies: c.competencies.into_iter().map(Into::into).collect(),
            assignments: c.assignments.into_iter().map(Into::into).collect(),
            materials: c.materials.into_iter().map(Into::into).collect(),
            students: c.students.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TeacherDashboardDto {
    pub user: UserDto,
    pub courses: Vec<TeacherCourseDto>,
    pub pending_evaluations: Vec<SubmissionDto>,
}

impl From<TeacherDashboard> for TeacherDashboardDto {
    fn from(d: TeacherDashboard) -> Self {
        TeacherDashboardDto {
            user: d.teacher.into(),
            courses: d.courses.into_iter().map(Into::into).collect(),
            pending_evaluations: d.pending_evaluations.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AdminDashboardDto {
    pub user: UserDto,
    pub total_users: usize,
    pub users_by_role: BTreeMap<String, usize>,
}

impl From<AdminDashboard> for AdminDashboardDto {
    fn from(d: AdminDashboard) -> Self {
        AdminDashboardDto {
            user: d.admin.into(),
            total_users: d.total_users,
            users_by_role: d
                .users_by_role
                .into_iter()
                .map(|(role, count)| (role.as_str().to_string(), count))
                .collect(),
        }
    }
}

/// The dashboard of the calling user, tagged with the role it was built for.
#[derive(Serialize, Debug, ToSchema)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DashboardDto {
    Student(StudentDashboardDto),
    Teacher(TeacherDashboardDto),
    Admin(AdminDashboardDto),
}

impl From<Dashboard> for DashboardDto {
    fn from(d: Dashboard) -> Self {
        match d {
            Dashboard::Student(view) => DashboardDto::Student(view.into()),
            Dashboard::Teacher(view) => DashboardDto::Teacher(view.into()),
            Dashboard::Admin(view) => DashboardDto::Admin(view.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::domain::Role;

    #[test]
    fn dashboard_is_tagged_with_the_role() {
        let dto = DashboardDto::Admin(AdminDashboardDto {
            user: UserDto {
                id: "a1".to_string(),
                email: "a1@example.org".to_string(),
                full_name: None,
                role: Role::Admin.as_str().to_string(),
            },
            total_users: 1,
            users_by_role: BTreeMap::from([("admin".to_string(), 1)]),
        });
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["total_users"], 1);
        assert_eq!(json["users_by_role"]["admin"], 1);
    }

    #[test]
    fn assignment_kind_defaults_and_uses_type_key() {
        let req: NewAssignmentRequest = serde_json::from_str(r#"{"title": "Essay"}"#).unwrap();
        assert_eq!(req.kind, "assignment");

        let req: NewAssignmentRequest =
            serde_json::from_str(r#"{"title": "Check-in", "type": "quiz", "max_attempts": 3}"#)
                .unwrap();
        assert_eq!(req.kind, "quiz");
        assert_eq!(req.max_attempts, Some(3));
    }

    #[test]
    fn assignment_patch_tells_null_from_missing() {
        let req: AssignmentPatchRequest =
            serde_json::from_str(r#"{"end_date": null, "max_attempts": 4}"#).unwrap();
        let patch = AssignmentPatch::from(req);
        assert_eq!(patch.start_date, None);
        assert_eq!(patch.end_date, Some(None));
        assert_eq!(patch.max_attempts, Some(Some(4)));

        let req: AssignmentPatchRequest = serde_json::from_str(r#"{"title": "Lab"}"#).unwrap();
        let patch = AssignmentPatch::from(req);
        assert_eq!(patch.end_date, None);
        assert_eq!(patch.max_attempts, None);
    }

    #[test]
    fn evaluation_fields_are_optional() {
        let req: EvaluationRequest = serde_json::from_str(r#"{"feedback": "Nice"}"#).unwrap();
        let evaluation = Evaluation::from(req);
        assert_eq!(evaluation.grade, None);
        assert_eq!(evaluation.feedback.as_deref(), Some("Nice"));
    }
}
