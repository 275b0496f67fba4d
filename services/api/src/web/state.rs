//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use portal_core::assignment::AssignmentService;
use portal_core::competency::CompetencyService;
use portal_core::course::CourseService;
use portal_core::dashboard::DashboardAggregator;
use portal_core::enrollment::EnrollmentGuard;
use portal_core::evaluation::EvaluationMutator;
use portal_core::ports::RecordStore;
use portal_core::submission::SubmissionService;

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<Config>,
    pub courses: CourseService,
    pub enrollments: EnrollmentGuard,
    pub competencies: CompetencyService,
    pub assignments: AssignmentService,
    pub submissions: SubmissionService,
    pub evaluations: EvaluationMutator,
    pub dashboards: DashboardAggregator,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<Config>) -> Self {
        Self {
            courses: CourseService::new(store.clone()),
            enrollments: EnrollmentGuard::new(store.clone()),
            competencies: CompetencyService::new(store.clone()),
            assignments: AssignmentService::new(store.clone()),
            submissions: SubmissionService::new(store.clone()),
            evaluations: EvaluationMutator::new(store.clone()),
            dashboards: DashboardAggregator::new(store.clone()),
            store,
            config,
        }
    }
}
