//! Authorization Module for Course Core
//!
//! Course roles decide what a caller may do. Every check here works on an
//! already looked-up role so the rules stay testable without a canister
//! context; `lib.rs` resolves the caller principal before calling in.
//!
//! Denials use generic messages that do not reveal whether a resource
//! exists or who owns it.

use crate::error::{CourseError, Result};
use crate::forum::Topic;
use crate::submission::{Assessment, SubmissionPermissions};
use crate::types::CourseRole;

const NOT_ENROLLED: &str = "You are not enrolled in this course";
const STAFF_ONLY: &str = "Only course staff can perform this action";
const MANAGER_ONLY: &str = "Only course managers can perform this action";
const OWNER_ONLY: &str = "Only course owners can perform this action";

/// Require that the caller is enrolled in the course.
///
/// # Returns
/// * `Ok(CourseRole)` with the caller's role
/// * `Err(CourseError::Unauthorized)` if the caller has no role
pub fn require_enrolled(role: Option<CourseRole>) -> Result<CourseRole> {
    role.ok_or(CourseError::Unauthorized(NOT_ENROLLED))
}

/// Require a teaching assistant, manager or owner.
pub fn require_staff(role: Option<CourseRole>) -> Result<CourseRole> {
    let role = require_enrolled(role)?;
    if !role.is_staff() {
        return Err(CourseError::Unauthorized(STAFF_ONLY));
    }
    Ok(role)
}

/// Require a manager or owner.
pub fn require_manager(role: Option<CourseRole>) -> Result<CourseRole> {
    let role = require_enrolled(role)?;
    if !role.is_manager() {
        return Err(CourseError::Unauthorized(MANAGER_ONLY));
    }
    Ok(role)
}

/// Only owners may grant the owner role or change an owner's role.
pub fn check_role_change(
    caller: CourseRole,
    current: Option<CourseRole>,
    requested: Option<CourseRole>,
) -> Result<()> {
    if caller == CourseRole::Owner {
        return Ok(());
    }
    if requested == Some(CourseRole::Owner) || current == Some(CourseRole::Owner) {
        return Err(CourseError::Unauthorized(OWNER_ONLY));
    }
    Ok(())
}

/// Hidden topics are only visible to staff.
pub fn can_view_topic(role: CourseRole, topic: &Topic) -> bool {
    !topic.hidden || role.is_staff()
}

/// Locked topics only accept replies from staff.
pub fn can_reply(role: CourseRole, topic: &Topic) -> bool {
    !topic.locked || role.is_staff()
}

/// Permission booleans for a viewer acting on one submission.
///
/// * `can_unsubmit` - staff only
/// * `can_delete` - managers for any submission, staff for their own
/// * `can_view_logs` - staff, and only on password protected assessments
pub fn submission_permissions(
    viewer: CourseRole,
    is_own_submission: bool,
    assessment: &Assessment,
) -> SubmissionPermissions {
    SubmissionPermissions {
        can_unsubmit: viewer.is_staff(),
        can_delete: viewer.is_manager() || (viewer.is_staff() && is_own_submission),
        can_view_logs: viewer.is_staff() && assessment.password_protected,
    }
}
