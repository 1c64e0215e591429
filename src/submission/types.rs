//! Type definitions for the Submission module

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::gate::GateError;
use crate::selection::PostRef;
use crate::types::{CourseId, Timestamp};

// =============================================================================
// ID Type Aliases
// =============================================================================

pub type AssessmentId = u64;
pub type SubmissionId = u64;

// =============================================================================
// Workflow Types
// =============================================================================

/// Submission lifecycle
///
/// Advances Unstarted → Attempting → Submitted → Graded. Submitted and
/// Graded submissions return to Attempting through an authorized unsubmit.
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Unstarted,
    Attempting,
    Submitted,
    Graded,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Unstarted => "unstarted",
            WorkflowState::Attempting => "attempting",
            WorkflowState::Submitted => "submitted",
            WorkflowState::Graded => "graded",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstarted" => Ok(WorkflowState::Unstarted),
            "attempting" => Ok(WorkflowState::Attempting),
            "submitted" => Ok(WorkflowState::Submitted),
            "graded" => Ok(WorkflowState::Graded),
            other => Err(GateError::InvalidState(other.to_string())),
        }
    }
}

/// Actions a viewer can take on a submission
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubmissionAction {
    Submit,
    Unsubmit,
    Delete,
    ViewLogs,
}

impl fmt::Display for SubmissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionAction::Submit => "submit",
            SubmissionAction::Unsubmit => "unsubmit",
            SubmissionAction::Delete => "delete",
            SubmissionAction::ViewLogs => "view logs of",
        };
        f.write_str(name)
    }
}

/// What the viewer is permitted to do, independent of workflow state
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SubmissionPermissions {
    pub can_unsubmit: bool,
    pub can_delete: bool,
    pub can_view_logs: bool,
}

// =============================================================================
// Assessment & Submission Types
// =============================================================================

/// Assessment in a course
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Assessment {
    pub id: AssessmentId,
    pub course_id: CourseId,
    pub title: String,
    pub maximum_grade: f64,
    /// Password protected assessments keep access logs
    pub password_protected: bool,
    /// Forum posts a submission may select; 0 disables post selection
    pub max_forum_posts: u32,
    pub created_at: Timestamp,
}

/// A course user's submission for an assessment
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Submission {
    pub id: SubmissionId,
    pub assessment_id: AssessmentId,
    pub creator: Principal,
    pub workflow_state: WorkflowState,
    pub grade: Option<f64>,
    /// Forum posts committed for a forum post response
    pub selected_posts: Vec<PostRef>,
    pub created_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub graded_at: Option<Timestamp>,
}

/// Access to a password protected submission
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct AccessLog {
    pub submission_id: SubmissionId,
    pub viewer: Principal,
    pub accessed_at: Timestamp,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct CreateAssessmentArgs {
    pub course_id: CourseId,
    pub title: String,
    pub maximum_grade: f64,
    pub password_protected: Option<bool>,
    pub max_forum_posts: Option<u32>,
}

// =============================================================================
// Submissions Table Types
// =============================================================================

/// A button on a submissions table row
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RowControl {
    pub visible: bool,
    pub enabled: bool,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RowControls {
    pub unsubmit: RowControl,
    pub delete: RowControl,
    /// The logs link has no disabled state; it is shown or not
    pub view_logs: bool,
}

/// One row of an assessment's submissions table
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct SubmissionRow {
    pub course_user: Principal,
    pub name: String,
    pub phantom: bool,
    /// `None` for students who have not started
    pub submission_id: Option<SubmissionId>,
    pub workflow_state: WorkflowState,
    /// "--" while attempting or submitted, e.g. "7.5 / 10.0" once graded
    pub grade_display: Option<String>,
    /// Graded but grades not yet published
    pub unpublished_warning: bool,
    pub submitted_at: Option<Timestamp>,
    pub graded_at: Option<Timestamp>,
    pub log_count: u64,
    pub controls: RowControls,
}
