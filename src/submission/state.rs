//! State management for the Submission module

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;

use super::types::*;

/// State structure for assessments and submissions
#[derive(Default)]
pub struct SubmissionState {
    /// All assessments by ID
    pub assessments: BTreeMap<AssessmentId, Assessment>,
    /// All submissions by ID
    pub submissions: BTreeMap<SubmissionId, Submission>,
    /// (Assessment, Creator) -> Submission ID, one submission per user
    pub user_submissions: BTreeMap<(AssessmentId, Principal), SubmissionId>,
    /// Submission ID -> access logs (oldest first)
    pub access_logs: BTreeMap<SubmissionId, Vec<AccessLog>>,
    pub next_assessment_id: AssessmentId,
    pub next_submission_id: SubmissionId,
}

impl SubmissionState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self {
            assessments: BTreeMap::new(),
            submissions: BTreeMap::new(),
            user_submissions: BTreeMap::new(),
            access_logs: BTreeMap::new(),
            next_assessment_id: 1,
            next_submission_id: 1,
        }
    }

    pub fn next_assessment_id(&mut self) -> AssessmentId {
        let id = self.next_assessment_id;
        self.next_assessment_id += 1;
        id
    }

    pub fn next_submission_id(&mut self) -> SubmissionId {
        let id = self.next_submission_id;
        self.next_submission_id += 1;
        id
    }

    pub fn get_assessment(&self, id: AssessmentId) -> Option<&Assessment> {
        self.assessments.get(&id)
    }

    pub fn get_submission(&self, id: SubmissionId) -> Option<&Submission> {
        self.submissions.get(&id)
    }

    pub fn get_submission_mut(&mut self, id: SubmissionId) -> Option<&mut Submission> {
        self.submissions.get_mut(&id)
    }

    /// The user's submission for an assessment, if started
    pub fn find_submission(&self, assessment_id: AssessmentId, creator: &Principal) -> Option<&Submission> {
        self.user_submissions
            .get(&(assessment_id, *creator))
            .and_then(|id| self.submissions.get(id))
    }

    pub fn log_count(&self, submission_id: SubmissionId) -> u64 {
        self.access_logs
            .get(&submission_id)
            .map(|logs| logs.len() as u64)
            .unwrap_or(0)
    }

    /// Remove a submission with its index entry and access logs
    pub fn remove_submission(&mut self, id: SubmissionId) -> Option<Submission> {
        let submission = self.submissions.remove(&id)?;
        self.user_submissions
            .remove(&(submission.assessment_id, submission.creator));
        self.access_logs.remove(&id);
        Some(submission)
    }
}

thread_local! {
    pub static SUBMISSION_STATE: RefCell<SubmissionState> = RefCell::new(SubmissionState::new());
}

/// Helper function to access submission state
pub fn with_submission_state<F, R>(f: F) -> R
where
    F: FnOnce(&SubmissionState) -> R,
{
    SUBMISSION_STATE.with(|state| f(&state.borrow()))
}

/// Helper function to mutably access submission state
pub fn with_submission_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut SubmissionState) -> R,
{
    SUBMISSION_STATE.with(|state| f(&mut state.borrow_mut()))
}

// =============================================================================
// Stable Storage Types
// =============================================================================

/// Serializable state for canister upgrades
#[derive(CandidType, Deserialize, Serialize, Clone, Default)]
pub struct StableSubmissionState {
    pub assessments: Vec<(AssessmentId, Assessment)>,
    pub submissions: Vec<(SubmissionId, Submission)>,
    pub access_logs: Vec<(SubmissionId, Vec<AccessLog>)>,
    pub next_assessment_id: AssessmentId,
    pub next_submission_id: SubmissionId,
}

impl From<&SubmissionState> for StableSubmissionState {
    fn from(state: &SubmissionState) -> Self {
        StableSubmissionState {
            assessments: state.assessments.iter().map(|(k, v)| (*k, v.clone())).collect(),
            submissions: state.submissions.iter().map(|(k, v)| (*k, v.clone())).collect(),
            access_logs: state
                .access_logs
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            next_assessment_id: state.next_assessment_id,
            next_submission_id: state.next_submission_id,
        }
    }
}

impl From<StableSubmissionState> for SubmissionState {
    fn from(stable: StableSubmissionState) -> Self {
        // The per-user index is derived from the submissions themselves
        let user_submissions = stable
            .submissions
            .iter()
            .map(|(id, s)| ((s.assessment_id, s.creator), *id))
            .collect();

        SubmissionState {
            assessments: stable.assessments.into_iter().collect(),
            submissions: stable.submissions.into_iter().collect(),
            user_submissions,
            access_logs: stable.access_logs.into_iter().collect(),
            next_assessment_id: stable.next_assessment_id,
            next_submission_id: stable.next_submission_id,
        }
    }
}
