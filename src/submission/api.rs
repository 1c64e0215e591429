//! API functions for the Submission module
//!
//! Every mutating call resolves the viewer's permissions, asks the workflow
//! gate, and validates the transition before touching state.

use candid::Principal;

use super::gate::{allowed_actions, require_action, row_controls};
use super::state::{with_submission_state, with_submission_state_mut};
use super::types::*;
use super::validation::{validate_create_assessment, validate_grade, validate_transition};
use crate::authorization::{require_enrolled, require_manager, require_staff, submission_permissions};
use crate::error::{CourseError, Result};
use crate::selection::state::with_selection_state_mut;
use crate::state::with_state;
use crate::types::{CourseRole, Timestamp};

/// Submission, its assessment, and the caller's role in the course.
///
/// Students only ever see their own submissions.
pub(crate) fn load(caller: &Principal, submission_id: SubmissionId) -> Result<(Submission, Assessment, CourseRole)> {
    let (submission, assessment) = with_submission_state(|state| {
        let submission = state.get_submission(submission_id)?.clone();
        let assessment = state.get_assessment(submission.assessment_id)?.clone();
        Some((submission, assessment))
    })
    .ok_or(CourseError::NotFound("Submission"))?;

    let role = require_enrolled(with_state(|s| s.course_role(assessment.course_id, caller)))?;
    if !role.is_staff() && submission.creator != *caller {
        return Err(CourseError::NotFound("Submission"));
    }

    Ok((submission, assessment, role))
}

pub(crate) fn permissions_for(
    caller: &Principal,
    role: CourseRole,
    submission: &Submission,
    assessment: &Assessment,
) -> SubmissionPermissions {
    submission_permissions(role, submission.creator == *caller, assessment)
}

/// Move a submission to `target`, enforcing the transition rules
fn transition(submission: &mut Submission, target: WorkflowState) -> Result<()> {
    validate_transition(submission.workflow_state, target)?;
    submission.workflow_state = target;
    Ok(())
}

/// Grade column text for a submissions table row
pub fn grade_display(state: WorkflowState, grade: Option<f64>, maximum_grade: f64) -> Option<String> {
    let grade = match state {
        WorkflowState::Unstarted => return None,
        WorkflowState::Attempting | WorkflowState::Submitted => "--".to_string(),
        WorkflowState::Graded => grade
            .map(|g| format!("{:.1}", g))
            .unwrap_or_else(|| "--".to_string()),
    };
    Some(format!("{} / {:.1}", grade, maximum_grade))
}

// =============================================================================
// Assessment Operations
// =============================================================================

/// Create an assessment (managers only)
pub fn create_assessment(caller: Principal, args: CreateAssessmentArgs, now: Timestamp) -> Result<Assessment> {
    let (role, config) = with_state(|s| {
        (
            s.get_course(args.course_id).map(|_| s.course_role(args.course_id, &caller)),
            s.config.clone(),
        )
    });
    let role = role.ok_or(CourseError::NotFound("Course"))?;
    require_manager(role)?;
    validate_create_assessment(&args, &config)?;

    Ok(with_submission_state_mut(|state| {
        let id = state.next_assessment_id();
        let assessment = Assessment {
            id,
            course_id: args.course_id,
            title: args.title,
            maximum_grade: args.maximum_grade,
            password_protected: args.password_protected.unwrap_or(false),
            max_forum_posts: args.max_forum_posts.unwrap_or(0),
            created_at: now,
        };
        state.assessments.insert(id, assessment.clone());
        assessment
    }))
}

pub fn get_assessment(caller: Principal, assessment_id: AssessmentId) -> Result<Assessment> {
    let assessment = with_submission_state(|state| state.get_assessment(assessment_id).cloned())
        .ok_or(CourseError::NotFound("Assessment"))?;
    require_enrolled(with_state(|s| s.course_role(assessment.course_id, &caller)))?;
    Ok(assessment)
}

// =============================================================================
// Submission Operations
// =============================================================================

/// Start (or resume) the caller's submission for an assessment.
///
/// A new submission is created Unstarted and immediately moved to
/// Attempting.
pub fn start_submission(caller: Principal, assessment_id: AssessmentId, now: Timestamp) -> Result<Submission> {
    let assessment = get_assessment(caller, assessment_id)?;

    with_submission_state_mut(|state| {
        if let Some(existing) = state.find_submission(assessment.id, &caller) {
            return Ok(existing.clone());
        }

        let mut submission = Submission {
            id: state.next_submission_id(),
            assessment_id: assessment.id,
            creator: caller,
            workflow_state: WorkflowState::Unstarted,
            grade: None,
            selected_posts: vec![],
            created_at: now,
            submitted_at: None,
            graded_at: None,
        };
        transition(&mut submission, WorkflowState::Attempting)?;

        state
            .user_submissions
            .insert((assessment.id, caller), submission.id);
        state.submissions.insert(submission.id, submission.clone());

        Ok(submission)
    })
}

pub fn get_submission(caller: Principal, submission_id: SubmissionId) -> Result<Submission> {
    load(&caller, submission_id).map(|(submission, _, _)| submission)
}

/// Actions the caller may take on a submission right now
pub fn get_allowed_actions(caller: Principal, submission_id: SubmissionId) -> Result<Vec<SubmissionAction>> {
    let (submission, assessment, role) = load(&caller, submission_id)?;
    let permissions = permissions_for(&caller, role, &submission, &assessment);
    Ok(allowed_actions(submission.workflow_state, &permissions)
        .into_iter()
        .collect())
}

/// Finalize the caller's own submission
pub fn submit_submission(caller: Principal, submission_id: SubmissionId, now: Timestamp) -> Result<Submission> {
    let (submission, assessment, role) = load(&caller, submission_id)?;
    if submission.creator != caller {
        return Err(CourseError::Unauthorized("Only the owner can submit this submission"));
    }
    let permissions = permissions_for(&caller, role, &submission, &assessment);
    require_action(submission.workflow_state, &permissions, SubmissionAction::Submit)?;

    with_submission_state_mut(|state| {
        let submission = state
            .get_submission_mut(submission_id)
            .ok_or(CourseError::NotFound("Submission"))?;
        transition(submission, WorkflowState::Submitted)?;
        submission.submitted_at = Some(now);
        Ok(submission.clone())
    })
}

/// Return a submitted or graded submission to Attempting, clearing its grade
pub fn unsubmit_submission(caller: Principal, submission_id: SubmissionId) -> Result<Submission> {
    let (submission, assessment, role) = load(&caller, submission_id)?;
    let permissions = permissions_for(&caller, role, &submission, &assessment);
    require_action(submission.workflow_state, &permissions, SubmissionAction::Unsubmit)?;

    with_submission_state_mut(|state| {
        let submission = state
            .get_submission_mut(submission_id)
            .ok_or(CourseError::NotFound("Submission"))?;
        transition(submission, WorkflowState::Attempting)?;
        submission.grade = None;
        submission.submitted_at = None;
        submission.graded_at = None;
        Ok(submission.clone())
    })
}

/// Grade a submitted submission, or regrade a graded one (staff only)
pub fn grade_submission(
    caller: Principal,
    submission_id: SubmissionId,
    grade: f64,
    now: Timestamp,
) -> Result<Submission> {
    let (submission, assessment, role) = load(&caller, submission_id)?;
    require_staff(Some(role))?;
    validate_grade(grade, &assessment)?;

    with_submission_state_mut(|state| {
        let submission = state
            .get_submission_mut(submission.id)
            .ok_or(CourseError::NotFound("Submission"))?;
        if submission.workflow_state != WorkflowState::Graded {
            transition(submission, WorkflowState::Graded)?;
        }
        submission.grade = Some(grade);
        submission.graded_at = Some(now);
        Ok(submission.clone())
    })
}

/// Delete a submission and its access logs
pub fn delete_submission(caller: Principal, submission_id: SubmissionId) -> Result<Submission> {
    let (submission, assessment, role) = load(&caller, submission_id)?;
    let permissions = permissions_for(&caller, role, &submission, &assessment);
    require_action(submission.workflow_state, &permissions, SubmissionAction::Delete)?;

    let removed = with_submission_state_mut(|state| state.remove_submission(submission_id))
        .ok_or(CourseError::NotFound("Submission"))?;
    with_selection_state_mut(|state| state.clear_submission(submission_id));
    Ok(removed)
}

// =============================================================================
// Access Logs
// =============================================================================

/// Record that the owner opened a password protected submission.
/// Returns the number of recorded accesses.
pub fn record_access(caller: Principal, submission_id: SubmissionId, now: Timestamp) -> Result<u64> {
    let (submission, assessment, _) = load(&caller, submission_id)?;
    if submission.creator != caller {
        return Err(CourseError::Unauthorized("Only the owner's accesses are logged"));
    }
    if !assessment.password_protected {
        return Err(CourseError::Validation(
            "Assessment is not password protected".to_string(),
        ));
    }

    Ok(with_submission_state_mut(|state| {
        let logs = state.access_logs.entry(submission_id).or_default();
        logs.push(AccessLog {
            submission_id,
            viewer: caller,
            accessed_at: now,
        });
        logs.len() as u64
    }))
}

pub fn get_access_logs(caller: Principal, submission_id: SubmissionId) -> Result<Vec<AccessLog>> {
    let (submission, assessment, role) = load(&caller, submission_id)?;
    let permissions = permissions_for(&caller, role, &submission, &assessment);
    require_action(submission.workflow_state, &permissions, SubmissionAction::ViewLogs)?;

    Ok(with_submission_state(|state| {
        state
            .access_logs
            .get(&submission_id)
            .cloned()
            .unwrap_or_default()
    }))
}

// =============================================================================
// Submissions Table
// =============================================================================

/// One row per student of the course (staff only).
///
/// Students without a submission appear as Unstarted rows. `busy` disables
/// every row button while the client has a request for the table in flight.
pub fn list_submission_rows(
    caller: Principal,
    assessment_id: AssessmentId,
    busy: bool,
) -> Result<Vec<SubmissionRow>> {
    let assessment = with_submission_state(|state| state.get_assessment(assessment_id).cloned())
        .ok_or(CourseError::NotFound("Assessment"))?;
    let (role, users) = with_state(|s| {
        (
            s.course_role(assessment.course_id, &caller),
            s.get_course_users(assessment.course_id),
        )
    });
    let role = require_staff(role)?;

    Ok(with_submission_state(|state| {
        users
            .into_iter()
            .filter(|user| !user.role.is_staff())
            .map(|user| {
                let submission = state.find_submission(assessment.id, &user.principal);
                let workflow_state = submission
                    .map(|s| s.workflow_state)
                    .unwrap_or(WorkflowState::Unstarted);
                let permissions =
                    submission_permissions(role, user.principal == caller, &assessment);

                SubmissionRow {
                    course_user: user.principal,
                    name: user.name,
                    phantom: user.phantom,
                    submission_id: submission.map(|s| s.id),
                    workflow_state,
                    grade_display: grade_display(
                        workflow_state,
                        submission.and_then(|s| s.grade),
                        assessment.maximum_grade,
                    ),
                    unpublished_warning: workflow_state == WorkflowState::Graded,
                    submitted_at: submission.and_then(|s| s.submitted_at),
                    graded_at: submission.and_then(|s| s.graded_at),
                    log_count: submission.map(|s| state.log_count(s.id)).unwrap_or(0),
                    controls: row_controls(workflow_state, &permissions, busy),
                }
            })
            .collect()
    }))
}
