pub mod access;
pub mod assignment;
pub mod competency;
pub mod course;
pub mod dashboard;
pub mod domain;
pub mod enrollment;
pub mod error;
pub mod evaluation;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod status;
pub mod submission;

pub use domain::{
    Assignment, Competency, CompetencyValidation, Course, Enrollment, Material, Role, Submission,
    User,
};
pub use error::{CoreError, CoreResult, IntegrityWarning};
pub use ports::{RecordStore, StoreError, StoreResult};
