//! In-flight selection dialogs
//!
//! Buffers live only while a dialog is open. They are not part of stable
//! state, so an upgrade drops every open dialog and the committed
//! selections on submissions remain.

use candid::Principal;
use std::cell::RefCell;
use std::collections::BTreeMap;

use super::buffer::SelectionBuffer;
use crate::submission::SubmissionId;

#[derive(Default)]
pub struct SelectionState {
    /// (Editor, Submission) -> open buffer
    pub buffers: BTreeMap<(Principal, SubmissionId), SelectionBuffer>,
}

impl SelectionState {
    pub fn get(&self, user: &Principal, submission_id: SubmissionId) -> Option<&SelectionBuffer> {
        self.buffers.get(&(*user, submission_id))
    }

    pub fn get_mut(&mut self, user: &Principal, submission_id: SubmissionId) -> Option<&mut SelectionBuffer> {
        self.buffers.get_mut(&(*user, submission_id))
    }

    /// Drop every buffer opened against a submission
    pub fn clear_submission(&mut self, submission_id: SubmissionId) {
        self.buffers.retain(|(_, id), _| *id != submission_id);
    }
}

thread_local! {
    pub static SELECTION_STATE: RefCell<SelectionState> = RefCell::new(SelectionState::default());
}

pub fn with_selection_state<F, R>(f: F) -> R
where
    F: FnOnce(&SelectionState) -> R,
{
    SELECTION_STATE.with(|state| f(&state.borrow()))
}

pub fn with_selection_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut SelectionState) -> R,
{
    SELECTION_STATE.with(|state| f(&mut state.borrow_mut()))
}
