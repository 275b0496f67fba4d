//! crates/portal_core/src/status.rs
//!
//! Lifecycle status of an assignment for one student, derived from that
//! student's submissions, plus the attempt admission check used when a new
//! submission is created.

use std::cmp::Ordering;

use tracing::warn;

use crate::domain::{Assignment, AssignmentId, Submission};
use crate::error::{CoreError, CoreResult, IntegrityWarning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentStatus {
    Pending,
    Submitted,
    Graded,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Graded => "graded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusResolution {
    pub status: AssignmentStatus,
    pub latest_submission: Option<Submission>,
    /// Latest submission arrived after the assignment's end date. Display only.
    pub late: bool,
}

/// Resolves the status of `assignment` from one student's submissions.
///
/// Submissions for other assignments are ignored. The latest attempt decides:
/// a score means graded, a submission timestamp without a score means
/// submitted, anything else (including no attempt at all) is pending.
pub fn resolve_status(assignment: &Assignment, submissions: &[Submission]) -> StatusResolution {
    for warning in duplicate_attempts(assignment.id, submissions) {
        warn!("Integrity warning: {}", warning);
    }

    let latest = latest_submission(assignment.id, submissions);
    let status = match latest {
        None => AssignmentStatus::Pending,
        Some(s) if s.score.is_some() => AssignmentStatus::Graded,
        Some(s) if s.submitted_at.is_some() => AssignmentStatus::Submitted,
        Some(_) => AssignmentStatus::Pending,
    };
    let late = latest.map(|s| is_late(assignment, s)).unwrap_or(false);

    StatusResolution {
        status,
        latest_submission: latest.cloned(),
        late,
    }
}

/// The attempt with the highest number. On a tie the most recently created wins.
pub fn latest_submission(
    assignment_id: AssignmentId,
    submissions: &[Submission],
) -> Option<&Submission> {
    submissions
        .iter()
        .filter(|s| s.assignment_id == assignment_id)
        .max_by(|a, b| compare_attempts(a, b))
}

fn compare_attempts(a: &Submission, b: &Submission) -> Ordering {
    a.attempt_number
        .cmp(&b.attempt_number)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

pub fn is_late(assignment: &Assignment, submission: &Submission) -> bool {
    match (submission.submitted_at, assignment.end_date) {
        (Some(submitted_at), Some(end_date)) => submitted_at > end_date,
        _ => false,
    }
}

/// Reports every (student, attempt number) pair that appears more than once.
pub fn duplicate_attempts(
    assignment_id: AssignmentId,
    submissions: &[Submission],
) -> Vec<IntegrityWarning> {
    let mut seen: Vec<(&str, u32)> = Vec::new();
    let mut warnings = Vec::new();
    for s in submissions.iter().filter(|s| s.assignment_id == assignment_id) {
        let key = (s.student_id.as_str(), s.attempt_number);
        if seen.contains(&key) {
            let warning = IntegrityWarning::DuplicateAttempt {
                student_id: s.student_id.clone(),
                assignment_id,
                attempt_number: s.attempt_number,
            };
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        } else {
            seen.push(key);
        }
    }
    warnings
}

/// Decides whether a student may start another attempt and returns its number.
///
/// `existing` is the student's submissions; those for other assignments are
/// ignored. Fails with `AttemptLimitExceeded` once `max_attempts` is reached.
pub fn admit_attempt(assignment: &Assignment, existing: &[Submission]) -> CoreResult<u32> {
    let attempts: Vec<&Submission> = existing
        .iter()
        .filter(|s| s.assignment_id == assignment.id)
        .collect();
    let next = attempts
        .iter()
        .map(|s| s.attempt_number)
        .max()
        .unwrap_or(0)
        + 1;

    if let Some(max_attempts) = assignment.max_attempts {
        if attempts.len() as u32 >= max_attempts || next > max_attempts {
            return Err(CoreError::AttemptLimitExceeded {
                assignment_id: assignment.id,
                max_attempts,
            });
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn assignment(max_attempts: Option<u32>) -> Assignment {
        Assignment {
            id: 7,
            course_id: 1,
            title: "Essay".to_string(),
            description: None,
            kind: "assignment".to_string(),
            start_date: None,
            end_date: Some(Utc.with_ymd_and_hms(2025, 2, 15, 23, 59, 0).unwrap()),
            max_attempts,
        }
    }

    fn submission(id: i64, attempt: u32, score: Option<f64>) -> Submission {
        let created = Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap() + Duration::hours(id);
        Submission {
            id,
            assignment_id: 7,
            student_id: "s1".to_string(),
            attempt_number: attempt,
            content: "answer".to_string(),
            score,
            feedback: None,
            graded_by: None,
            submitted_at: Some(created),
            evaluated_at: score.map(|_| created),
            created_at: created,
        }
    }

    #[test]
    fn no_submissions_is_pending() {
        let resolution = resolve_status(&assignment(None), &[]);
        assert_eq!(resolution.status, AssignmentStatus::Pending);
        assert!(resolution.latest_submission.is_none());
        assert!(!resolution.late);
    }

    #[test]
    fn submitted_without_score() {
        let resolution = resolve_status(&assignment(None), &[submission(1, 1, None)]);
        assert_eq!(resolution.status, AssignmentStatus::Submitted);
    }

    #[test]
    fn scored_is_graded_regardless_of_feedback() {
        let mut with_feedback = submission(1, 1, Some(85.0));
        with_feedback.feedback = Some("Well argued".to_string());
        assert_eq!(
            resolve_status(&assignment(None), &[with_feedback]).status,
            AssignmentStatus::Graded
        );
        assert_eq!(
            resolve_status(&assignment(None), &[submission(1, 1, Some(0.0))]).status,
            AssignmentStatus::Graded
        );
    }

    #[test]
    fn missing_submission_timestamp_is_pending() {
        let mut draft = submission(1, 1, None);
        draft.submitted_at = None;
        assert_eq!(
            resolve_status(&assignment(None), &[draft]).status,
            AssignmentStatus::Pending
        );
    }

    #[test]
    fn latest_attempt_decides() {
        let subs = vec![submission(1, 1, Some(40.0)), submission(2, 2, None)];
        let resolution = resolve_status(&assignment(None), &subs);
        assert_eq!(resolution.status, AssignmentStatus::Submitted);
        assert_eq!(resolution.latest_submission.map(|s| s.id), Some(2));
    }

    #[test]
    fn duplicate_attempt_picks_most_recent_and_is_reported() {
        let subs = vec![submission(3, 1, None), submission(4, 1, Some(70.0))];
        let resolution = resolve_status(&assignment(None), &subs);
        assert_eq!(resolution.latest_submission.map(|s| s.id), Some(4));
        assert_eq!(duplicate_attempts(7, &subs).len(), 1);
    }

    #[test]
    fn other_assignments_are_ignored() {
        let mut other = submission(1, 1, Some(90.0));
        other.assignment_id = 8;
        assert_eq!(
            resolve_status(&assignment(None), &[other]).status,
            AssignmentStatus::Pending
        );
    }

    #[test]
    fn late_submission_is_still_submitted() {
        let mut late = submission(1, 1, None);
        late.submitted_at = Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        let resolution = resolve_status(&assignment(None), &[late]);
        assert_eq!(resolution.status, AssignmentStatus::Submitted);
        assert!(resolution.late);
    }

    #[test]
    fn admission_numbers_attempts_monotonically() {
        assert_eq!(admit_attempt(&assignment(None), &[]), Ok(1));
        let subs = vec![submission(1, 1, None), submission(2, 3, None)];
        assert_eq!(admit_attempt(&assignment(None), &subs), Ok(4));
    }

    #[test]
    fn admission_rejects_past_the_limit() {
        let subs = vec![submission(1, 1, None), submission(2, 2, None)];
        assert_eq!(
            admit_attempt(&assignment(Some(2)), &subs),
            Err(CoreError::AttemptLimitExceeded {
                assignment_id: 7,
                max_attempts: 2
            })
        );
        assert_eq!(admit_attempt(&assignment(Some(3)), &subs), Ok(3));
    }
}
