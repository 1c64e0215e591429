//! Workflow gating for submission actions
//!
//! The single place deciding which actions a viewer may take on a
//! submission, given its workflow state and the viewer's permissions. The
//! submissions table, the endpoints and the client all go through here.

use std::collections::BTreeSet;
use thiserror::Error;

use super::types::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Unknown workflow state: {0}")]
    InvalidState(String),
    #[error("Cannot {action} a submission that is {state}")]
    NotAllowed {
        action: SubmissionAction,
        state: WorkflowState,
    },
}

/// Actions permitted for a submission in `state`.
///
/// * Unstarted: nothing
/// * Attempting: submit; delete and view logs per permissions
/// * Submitted, Graded: unsubmit, delete and view logs per permissions
pub fn allowed_actions(
    state: WorkflowState,
    permissions: &SubmissionPermissions,
) -> BTreeSet<SubmissionAction> {
    let mut actions = BTreeSet::new();

    match state {
        WorkflowState::Unstarted => {}
        WorkflowState::Attempting => {
            actions.insert(SubmissionAction::Submit);
        }
        WorkflowState::Submitted | WorkflowState::Graded => {
            if permissions.can_unsubmit {
                actions.insert(SubmissionAction::Unsubmit);
            }
        }
    }

    if state != WorkflowState::Unstarted {
        if permissions.can_delete {
            actions.insert(SubmissionAction::Delete);
        }
        if permissions.can_view_logs {
            actions.insert(SubmissionAction::ViewLogs);
        }
    }

    actions
}

/// Gate a workflow state given by name, e.g. from a client payload.
pub fn actions_for(
    state: &str,
    permissions: &SubmissionPermissions,
) -> Result<BTreeSet<SubmissionAction>, GateError> {
    let state: WorkflowState = state.parse()?;
    Ok(allowed_actions(state, permissions))
}

/// Like [`actions_for`], but an unknown state is logged and denies
/// everything.
pub fn actions_or_deny(
    state: &str,
    permissions: &SubmissionPermissions,
) -> BTreeSet<SubmissionAction> {
    match actions_for(state, permissions) {
        Ok(actions) => actions,
        Err(err) => {
            log!("Denying all submission actions: {}", err);
            BTreeSet::new()
        }
    }
}

/// Fail with `NotAllowed` unless `action` is permitted.
pub fn require_action(
    state: WorkflowState,
    permissions: &SubmissionPermissions,
    action: SubmissionAction,
) -> Result<(), GateError> {
    if allowed_actions(state, permissions).contains(&action) {
        Ok(())
    } else {
        Err(GateError::NotAllowed { action, state })
    }
}

/// Button state for a submissions table row.
///
/// Buttons are shown when the viewer holds the permission at all and are
/// enabled only when the gate allows the action and nothing else is in
/// flight for the table (`busy`).
pub fn row_controls(
    state: WorkflowState,
    permissions: &SubmissionPermissions,
    busy: bool,
) -> RowControls {
    let allowed = allowed_actions(state, permissions);

    RowControls {
        unsubmit: RowControl {
            visible: permissions.can_unsubmit,
            enabled: !busy && allowed.contains(&SubmissionAction::Unsubmit),
        },
        delete: RowControl {
            visible: permissions.can_delete,
            enabled: !busy && allowed.contains(&SubmissionAction::Delete),
        },
        view_logs: allowed.contains(&SubmissionAction::ViewLogs),
    }
}
