//! Submission Module
//!
//! Assessments, student submissions and their workflow.
//!
//! Key Features:
//! - Four-state workflow: Unstarted → Attempting → Submitted → Graded
//! - Authorized unsubmit back to Attempting
//! - One pure gate deciding submit/unsubmit/delete/view-logs
//! - Access logs for password protected assessments
//! - Submissions table rows projected from state

pub mod api;
pub mod gate;
pub mod state;
pub mod types;
pub mod validation;

pub use gate::GateError;
pub use types::{
    AccessLog, Assessment, AssessmentId, CreateAssessmentArgs, Submission, SubmissionAction,
    SubmissionId, SubmissionPermissions, SubmissionRow, WorkflowState,
};
