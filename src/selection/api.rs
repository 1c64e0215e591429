//! API functions for the Selection module
//!
//! A dialog is opened per (caller, submission). Toggles only touch the
//! buffer; the submission's committed selection changes on commit or
//! through `remove_selected_post`.

use candid::Principal;

use super::buffer::{SelectionBuffer, SelectionError};
use super::state::{with_selection_state, with_selection_state_mut};
use super::types::*;
use super::view::{build_view, candidate, forum_groups};
use crate::error::{CourseError, Result};
use crate::forum::state::with_forum_state;
use crate::forum::PostId;
use crate::submission::api::{load, permissions_for};
use crate::submission::gate::require_action;
use crate::submission::state::with_submission_state_mut;
use crate::submission::{Assessment, Submission, SubmissionAction, SubmissionId};
use crate::types::CourseRole;

/// Load a submission whose post selection the caller may edit.
///
/// Only the owner edits, only while the gate allows submitting (i.e. the
/// submission is being attempted), and only if the assessment takes posts.
fn editable(caller: &Principal, submission_id: SubmissionId) -> Result<(Submission, Assessment, CourseRole)> {
    let (submission, assessment, role) = load(caller, submission_id)?;
    if submission.creator != *caller {
        return Err(CourseError::Unauthorized(
            "Only the owner can select posts for this submission",
        ));
    }
    if assessment.max_forum_posts == 0 {
        return Err(CourseError::Validation(
            "This assessment does not accept forum posts".to_string(),
        ));
    }
    let permissions = permissions_for(caller, role, &submission, &assessment);
    require_action(submission.workflow_state, &permissions, SubmissionAction::Submit)?;

    Ok((submission, assessment, role))
}

fn render(
    caller: &Principal,
    submission_id: SubmissionId,
    assessment: &Assessment,
    role: CourseRole,
    buffer: &SelectionBuffer,
) -> SelectionView {
    let forums = with_forum_state(|state| forum_groups(state, assessment.course_id, caller, role, buffer));
    build_view(submission_id, buffer, forums)
}

fn current_buffer(caller: &Principal, submission_id: SubmissionId) -> Result<SelectionBuffer> {
    with_selection_state(|state| state.get(caller, submission_id).cloned())
        .ok_or(CourseError::NotFound("Post selection"))
}

/// Open the dialog, seeded with the committed selection.
/// Reopening replaces any earlier buffer.
pub fn open_post_selection(caller: Principal, submission_id: SubmissionId) -> Result<SelectionView> {
    let (submission, assessment, role) = editable(&caller, submission_id)?;
    let buffer = SelectionBuffer::open(
        submission.selected_posts.clone(),
        assessment.max_forum_posts as usize,
    );
    let view = render(&caller, submission_id, &assessment, role, &buffer);

    with_selection_state_mut(|state| state.buffers.insert((caller, submission_id), buffer));
    Ok(view)
}

pub fn get_post_selection(caller: Principal, submission_id: SubmissionId) -> Result<SelectionView> {
    let (_, assessment, role) = load(&caller, submission_id)?;
    let buffer = current_buffer(&caller, submission_id)?;
    Ok(render(&caller, submission_id, &assessment, role, &buffer))
}

/// Toggle one of the caller's posts.
///
/// Hitting the limit is not an error: the view comes back unchanged with a
/// notification.
pub fn toggle_post_selection(
    caller: Principal,
    submission_id: SubmissionId,
    post_id: PostId,
) -> Result<ToggleSelectionResponse> {
    let (_, assessment, role) = editable(&caller, submission_id)?;

    // A selected entry can always be removed, even once its topic is hidden
    // or gone. Only additions must be selectable posts.
    let selected = with_selection_state(|state| {
        state.get(&caller, submission_id).and_then(|buffer| {
            buffer
                .selected()
                .iter()
                .find(|e| e.post_id == post_id)
                .copied()
        })
    });
    let entry = match selected {
        Some(entry) => entry,
        None => with_forum_state(|state| candidate(state, assessment.course_id, &caller, role, post_id))
            .ok_or(CourseError::NotFound("Post"))?,
    };

    let (outcome, buffer) = with_selection_state_mut(|state| {
        let buffer = state.get_mut(&caller, submission_id)?;
        Some((buffer.toggle(entry), buffer.clone()))
    })
    .ok_or(CourseError::NotFound("Post selection"))?;

    let notification = match outcome {
        Ok(()) => None,
        Err(err @ SelectionError::Limit { .. }) => Some(err.to_string()),
        Err(err) => return Err(err.into()),
    };

    Ok(ToggleSelectionResponse {
        view: render(&caller, submission_id, &assessment, role, &buffer),
        notification,
    })
}

/// Confirm the dialog, storing its selection on the submission
pub fn commit_post_selection(caller: Principal, submission_id: SubmissionId) -> Result<Submission> {
    editable(&caller, submission_id)?;

    let selected = with_selection_state_mut(|state| {
        state
            .get_mut(&caller, submission_id)
            .map(SelectionBuffer::commit)
    })
    .ok_or(CourseError::NotFound("Post selection"))??;

    let submission = with_submission_state_mut(|state| {
        let submission = state
            .get_submission_mut(submission_id)
            .ok_or(CourseError::NotFound("Submission"))?;
        submission.selected_posts = selected;
        Ok::<_, CourseError>(submission.clone())
    })?;

    log!(
        "Submission {} now references {} forum post(s)",
        submission_id,
        submission.selected_posts.len()
    );
    Ok(submission)
}

/// Cancel the dialog; the committed selection is untouched
pub fn discard_post_selection(caller: Principal, submission_id: SubmissionId) -> Result<()> {
    load(&caller, submission_id)?;
    with_selection_state_mut(|state| {
        state
            .get_mut(&caller, submission_id)
            .map(SelectionBuffer::discard)
    })
    .ok_or(CourseError::NotFound("Post selection"))??;
    Ok(())
}

/// Drop a post from the committed selection without opening the dialog.
///
/// An open dialog for the submission restarts from the new selection.
pub fn remove_selected_post(
    caller: Principal,
    submission_id: SubmissionId,
    post_id: PostId,
) -> Result<Submission> {
    let (submission, assessment, _) = editable(&caller, submission_id)?;
    if !submission.selected_posts.iter().any(|e| e.post_id == post_id) {
        return Err(CourseError::NotFound("Selected post"));
    }

    let submission = with_submission_state_mut(|state| {
        let submission = state
            .get_submission_mut(submission_id)
            .ok_or(CourseError::NotFound("Submission"))?;
        submission.selected_posts.retain(|e| e.post_id != post_id);
        Ok::<_, CourseError>(submission.clone())
    })?;

    with_selection_state_mut(|state| {
        if let Some(buffer) = state.get_mut(&caller, submission_id) {
            if buffer.status() == SelectionStatus::Open {
                *buffer = SelectionBuffer::open(
                    submission.selected_posts.clone(),
                    assessment.max_forum_posts as usize,
                );
            }
        }
    });

    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::api::{create_forum, create_post, create_topic, delete_topic, set_hidden};
    use crate::forum::{CreateForumArgs, CreatePostArgs, CreateTopicArgs, TopicId, TopicKind};
    use crate::state::with_state_mut;
    use crate::submission::api::{create_assessment, start_submission, submit_submission};
    use crate::submission::{CreateAssessmentArgs, WorkflowState};
    use crate::types::{AddCourseUserRequest, CreateCourseRequest};

    fn principal(n: u8) -> Principal {
        Principal::from_slice(&[n; 10])
    }

    fn owner() -> Principal {
        principal(1)
    }

    fn student() -> Principal {
        principal(2)
    }

    struct Fixture {
        submission_id: SubmissionId,
        /// The student's three forum posts
        posts: Vec<PostId>,
        /// A post by the owner
        foreign_post: PostId,
        topic_id: TopicId,
    }

    fn setup(max_forum_posts: u32) -> Fixture {
        with_state_mut(|state| {
            state.create_course(
                owner(),
                CreateCourseRequest {
                    title: "CS1010".to_string(),
                    owner_name: "Prof".to_string(),
                },
                0,
            );
            state.upsert_course_user(
                AddCourseUserRequest {
                    course_id: 1,
                    principal: student(),
                    name: "Alice".to_string(),
                    role: None,
                    phantom: None,
                },
                0,
            );
        });

        let forum = create_forum(
            owner(),
            CreateForumArgs {
                course_id: 1,
                name: "General".to_string(),
                description: None,
            },
            0,
        )
        .unwrap();
        let topic = create_topic(
            owner(),
            CreateTopicArgs {
                course_id: 1,
                kind: TopicKind::Forum {
                    forum_id: forum.id,
                    title: "Introductions".to_string(),
                },
                text: "Say hi".to_string(),
            },
            0,
        )
        .unwrap();
        let posts = (0..3)
            .map(|i| {
                create_post(
                    student(),
                    CreatePostArgs {
                        topic_id: topic.id,
                        text: format!("Hi #{}", i),
                    },
                    1,
                )
                .unwrap()
                .id
            })
            .collect();

        let assessment = create_assessment(
            owner(),
            CreateAssessmentArgs {
                course_id: 1,
                title: "Reflection".to_string(),
                maximum_grade: 10.0,
                password_protected: None,
                max_forum_posts: Some(max_forum_posts),
            },
            0,
        )
        .unwrap();
        let submission = start_submission(student(), assessment.id, 2).unwrap();

        Fixture {
            submission_id: submission.id,
            posts,
            foreign_post: topic.post_ids[0],
            topic_id: topic.id,
        }
    }

    fn selected_ids(view: &SelectionView) -> Vec<PostId> {
        view.selected.iter().map(|e| e.post_id).collect()
    }

    #[test]
    fn test_toggle_and_commit() {
        let f = setup(2);
        let view = open_post_selection(student(), f.submission_id).unwrap();
        assert!(view.selected.is_empty());
        assert!(!view.confirm_enabled);
        assert_eq!(view.forums.len(), 1);
        assert_eq!(view.forums[0].topics[0].posts.len(), 3);

        let response = toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        assert!(response.notification.is_none());
        assert!(response.view.confirm_enabled);

        let submission = commit_post_selection(student(), f.submission_id).unwrap();
        assert_eq!(submission.selected_posts.len(), 1);
        assert_eq!(submission.selected_posts[0].post_id, f.posts[0]);

        let view = get_post_selection(student(), f.submission_id).unwrap();
        assert_eq!(view.status, SelectionStatus::Committed);
    }

    #[test]
    fn test_limit_becomes_notification() {
        let f = setup(2);
        open_post_selection(student(), f.submission_id).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[1]).unwrap();

        let response = toggle_post_selection(student(), f.submission_id, f.posts[2]).unwrap();
        assert!(response.notification.is_some());
        assert_eq!(selected_ids(&response.view), vec![f.posts[0], f.posts[1]]);

        let response = toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        assert!(response.notification.is_none());
        assert_eq!(selected_ids(&response.view), vec![f.posts[1]]);
    }

    #[test]
    fn test_discard_keeps_committed_selection() {
        let f = setup(2);
        open_post_selection(student(), f.submission_id).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        commit_post_selection(student(), f.submission_id).unwrap();

        let view = open_post_selection(student(), f.submission_id).unwrap();
        assert_eq!(selected_ids(&view), vec![f.posts[0]]);
        assert!(view.forums[0].expanded_on_load);

        toggle_post_selection(student(), f.submission_id, f.posts[1]).unwrap();
        discard_post_selection(student(), f.submission_id).unwrap();

        let submission = crate::submission::api::get_submission(student(), f.submission_id).unwrap();
        assert_eq!(submission.selected_posts.len(), 1);

        // Closed dialogs reject further edits
        let err = toggle_post_selection(student(), f.submission_id, f.posts[2]).unwrap_err();
        assert_eq!(
            err,
            CourseError::Selection(SelectionError::Closed(SelectionStatus::Discarded))
        );
    }

    #[test]
    fn test_foreign_post_not_selectable() {
        let f = setup(2);
        open_post_selection(student(), f.submission_id).unwrap();
        assert_eq!(
            toggle_post_selection(student(), f.submission_id, f.foreign_post).unwrap_err(),
            CourseError::NotFound("Post")
        );
    }

    #[test]
    fn test_disabled_when_no_posts_allowed() {
        let f = setup(0);
        assert!(matches!(
            open_post_selection(student(), f.submission_id),
            Err(CourseError::Validation(_))
        ));
    }

    #[test]
    fn test_not_editable_after_submit() {
        let f = setup(2);
        open_post_selection(student(), f.submission_id).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        let submitted = submit_submission(student(), f.submission_id, 3).unwrap();
        assert_eq!(submitted.workflow_state, WorkflowState::Submitted);

        assert!(matches!(
            commit_post_selection(student(), f.submission_id),
            Err(CourseError::Gate(_))
        ));
        let submission = crate::submission::api::get_submission(student(), f.submission_id).unwrap();
        assert!(submission.selected_posts.is_empty());
    }

    #[test]
    fn test_owner_only() {
        let f = setup(2);
        assert!(matches!(
            open_post_selection(owner(), f.submission_id),
            Err(CourseError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_remove_selected_post_resets_open_dialog() {
        let f = setup(3);
        open_post_selection(student(), f.submission_id).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[1]).unwrap();
        commit_post_selection(student(), f.submission_id).unwrap();

        open_post_selection(student(), f.submission_id).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[2]).unwrap();

        let submission = remove_selected_post(student(), f.submission_id, f.posts[0]).unwrap();
        assert_eq!(submission.selected_posts.len(), 1);

        let view = get_post_selection(student(), f.submission_id).unwrap();
        assert_eq!(selected_ids(&view), vec![f.posts[1]]);
        assert!(!view.confirm_enabled);

        assert_eq!(
            remove_selected_post(student(), f.submission_id, f.posts[0]).unwrap_err(),
            CourseError::NotFound("Selected post")
        );
    }

    /// Commit one post with a limit of one, then make it unselectable
    fn commit_then(f: &Fixture, make_unselectable: impl FnOnce()) {
        open_post_selection(student(), f.submission_id).unwrap();
        toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        commit_post_selection(student(), f.submission_id).unwrap();
        make_unselectable();

        let view = open_post_selection(student(), f.submission_id).unwrap();
        assert_eq!(view.selected_count, 1);
    }

    #[test]
    fn test_deselect_post_in_hidden_topic() {
        let f = setup(1);
        commit_then(&f, || set_hidden(owner(), f.topic_id, true).unwrap());

        let response = toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        assert!(response.notification.is_none());
        assert_eq!(response.view.selected_count, 0);

        // Hidden posts still cannot be added back
        assert_eq!(
            toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap_err(),
            CourseError::NotFound("Post")
        );
    }

    #[test]
    fn test_deselect_post_of_deleted_topic() {
        let f = setup(1);
        commit_then(&f, || {
            delete_topic(owner(), f.topic_id).unwrap();
        });

        let response = toggle_post_selection(student(), f.submission_id, f.posts[0]).unwrap();
        assert!(response.view.selected.is_empty());
        assert!(response.view.confirm_enabled);

        let submission = commit_post_selection(student(), f.submission_id).unwrap();
        assert!(submission.selected_posts.is_empty());
    }
}
