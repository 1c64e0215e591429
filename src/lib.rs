#[macro_use]
mod logging;

mod authorization;
mod error;
mod forum;
mod selection;
mod state;
mod submission;
mod types;

use candid::Principal;
use ic_cdk_macros::{init, post_upgrade, pre_upgrade, query, update};

use authorization::{check_role_change, require_enrolled, require_manager};
use forum::{
    CreateForumArgs, CreatePostArgs, CreateTopicArgs, Forum, ForumId, Post, PostId, Topic,
    TopicId, TopicSummary, TopicView,
};
use selection::{SelectionView, ToggleSelectionResponse};
use submission::{
    AccessLog, Assessment, AssessmentId, CreateAssessmentArgs, Submission, SubmissionAction,
    SubmissionId, SubmissionPermissions, SubmissionRow,
};

pub use state::{State, StableState, STATE};
pub use types::*;

// =============================================================================
// Canister Lifecycle
// =============================================================================

#[init]
fn init(controllers: Option<Vec<Principal>>) {
    let effective_controllers = controllers.unwrap_or_else(|| vec![ic_cdk::caller()]);
    STATE.with(|state| {
        let mut s = state.borrow_mut();
        s.controllers = effective_controllers;
    });

    ic_cdk::println!("===========================================");
    ic_cdk::println!("Course Core Initialization Complete");
    ic_cdk::println!("===========================================");
}

#[pre_upgrade]
fn pre_upgrade() {
    STATE.with(|state| {
        let s = state.borrow();
        let stable: StableState = (&*s).into();
        ic_cdk::storage::stable_save((stable,)).expect("Failed to save state to stable storage");
    });
}

#[post_upgrade]
fn post_upgrade() {
    let restored_state = match ic_cdk::storage::stable_restore::<(StableState,)>() {
        Ok((saved_state,)) => {
            ic_cdk::println!("Restored state from stable storage");
            State::from(saved_state)
        }
        Err(e) => {
            ic_cdk::println!("No previous state found ({}), using default state", e);
            State::new()
        }
    };

    STATE.with(|state| {
        *state.borrow_mut() = restored_state;
    });

    ic_cdk::println!("===========================================");
    ic_cdk::println!("Course Core Upgrade Complete");
    ic_cdk::println!("===========================================");
}

// =============================================================================
// Configuration
// =============================================================================

#[update]
async fn set_config(config: CanisterConfig) -> Result<(), String> {
    require_controller().await?;

    if config.max_title_len == 0 || config.max_post_len == 0 || config.topic_page_size == 0 {
        return Err("Limits must be greater than zero".to_string());
    }

    ic_cdk::println!("Config updated: {:?}", config);
    state::with_state_mut(|s| s.config = config);
    Ok(())
}

#[query]
fn get_config() -> CanisterConfig {
    state::with_state(|s| s.config.clone())
}

#[query]
fn get_controllers() -> Vec<Principal> {
    STATE.with(|state| state.borrow().get_controllers())
}

// =============================================================================
// Access Control
// =============================================================================

async fn require_controller() -> Result<(), String> {
    let caller = ic_cdk::caller();

    let is_authorized = STATE.with(|state| state.borrow().is_controller(&caller));

    if !is_authorized {
        use ic_cdk::api::management_canister::main::{canister_status, CanisterIdRecord};

        let status = canister_status(CanisterIdRecord {
            canister_id: ic_cdk::id(),
        })
        .await
        .map_err(|(code, msg)| format!("Failed to query canister status: {:?}: {}", code, msg))?
        .0;

        if !status.settings.controllers.contains(&caller) {
            return Err("Unauthorized: Only controllers can perform this action".to_string());
        }

        STATE.with(|state| {
            state.borrow_mut().controllers = status.settings.controllers;
        });
    }

    Ok(())
}

fn require_authenticated() -> Result<Principal, String> {
    let caller = ic_cdk::caller();
    if caller == Principal::anonymous() {
        return Err("Authentication required".to_string());
    }
    Ok(caller)
}

// =============================================================================
// Course API
// =============================================================================

#[update]
fn create_course(request: CreateCourseRequest) -> Result<Course, String> {
    let owner = require_authenticated()?;
    state::with_state(|s| forum::validation::validate_title(&request.title, &s.config))?;

    let course = state::with_state_mut(|s| s.create_course(owner, request, ic_cdk::api::time()));

    ic_cdk::println!("Created course {} for {}", course.id, owner);
    Ok(course)
}

#[query]
fn get_course(id: CourseId) -> Option<Course> {
    state::with_state(|s| s.get_course(id).cloned())
}

#[query]
fn get_my_courses() -> Vec<Course> {
    let caller = ic_cdk::caller();
    if caller == Principal::anonymous() {
        return vec![];
    }

    state::with_state(|s| s.get_user_courses(&caller))
}

/// Enrol a user or change their role (managers only).
/// Only owners may hand out the owner role or change an owner.
#[update]
fn add_course_user(request: AddCourseUserRequest) -> Result<CourseUser, String> {
    let caller = require_authenticated()?;

    state::with_state_mut(|s| {
        if s.get_course(request.course_id).is_none() {
            return Err("Course not found".to_string());
        }
        let role = require_manager(s.course_role(request.course_id, &caller))?;
        check_role_change(
            role,
            s.course_role(request.course_id, &request.principal),
            request.role,
        )?;

        let user = s.upsert_course_user(request, ic_cdk::api::time());
        ic_cdk::println!(
            "Course {}: {} enrolled as {:?}",
            user.course_id,
            user.principal,
            user.role
        );
        Ok(user)
    })
}

#[query]
fn get_course_users(
    course_id: CourseId,
    pagination: Option<PaginationParams>,
) -> Result<PaginatedResponse<CourseUser>, String> {
    let caller = ic_cdk::caller();

    state::with_state(|s| {
        require_enrolled(s.course_role(course_id, &caller))?;
        Ok(s.get_course_users_page(course_id, pagination.unwrap_or_default()))
    })
}

// =============================================================================
// Forum API
// =============================================================================

#[update]
fn create_forum(args: CreateForumArgs) -> Result<Forum, String> {
    let caller = require_authenticated()?;
    let forum = forum::api::create_forum(caller, args, ic_cdk::api::time())?;

    ic_cdk::println!("Created forum {} in course {}", forum.id, forum.course_id);
    Ok(forum)
}

#[query]
fn list_forums(course_id: CourseId) -> Result<Vec<Forum>, String> {
    Ok(forum::api::list_forums(ic_cdk::caller(), course_id)?)
}

#[update]
fn create_topic(args: CreateTopicArgs) -> Result<Topic, String> {
    let caller = require_authenticated()?;
    let topic = forum::api::create_topic(caller, args, ic_cdk::api::time())?;

    ic_cdk::println!("Created topic {} for {}", topic.id, caller);
    Ok(topic)
}

#[update]
fn create_post(args: CreatePostArgs) -> Result<Post, String> {
    let caller = require_authenticated()?;
    Ok(forum::api::create_post(caller, args, ic_cdk::api::time())?)
}

/// Load a page of a topic. An update call because the loaded posts are
/// marked as read for the caller.
#[update]
fn show_topic(topic_id: TopicId, offset: Option<u64>) -> Result<TopicView, String> {
    let caller = require_authenticated()?;
    Ok(forum::api::show_topic(caller, topic_id, offset, ic_cdk::api::time())?)
}

#[query]
fn list_topics(forum_id: ForumId) -> Result<Vec<TopicSummary>, String> {
    Ok(forum::api::list_topics(ic_cdk::caller(), forum_id)?)
}

#[query]
fn unread_topics(course_id: CourseId) -> Result<Vec<TopicId>, String> {
    Ok(forum::api::unread_topics(ic_cdk::caller(), course_id)?)
}

#[query]
fn is_post_unread(post_id: PostId) -> Result<bool, String> {
    Ok(forum::api::is_post_unread(ic_cdk::caller(), post_id)?)
}

#[update]
fn mark_all_read(course_id: CourseId) -> Result<u64, String> {
    let caller = require_authenticated()?;
    Ok(forum::api::mark_all_read(caller, course_id, ic_cdk::api::time())?)
}

#[query]
fn topics_from_user(course_id: CourseId) -> Result<Vec<TopicId>, String> {
    Ok(forum::api::topics_from_user(ic_cdk::caller(), course_id)?)
}

#[update]
fn set_topic_locked(topic_id: TopicId, locked: bool) -> Result<(), String> {
    let caller = require_authenticated()?;
    Ok(forum::api::set_locked(caller, topic_id, locked)?)
}

#[update]
fn set_topic_hidden(topic_id: TopicId, hidden: bool) -> Result<(), String> {
    let caller = require_authenticated()?;
    Ok(forum::api::set_hidden(caller, topic_id, hidden)?)
}

#[update]
fn set_topic_subscribed(topic_id: TopicId, subscribed: bool) -> Result<(), String> {
    let caller = require_authenticated()?;
    Ok(forum::api::set_subscribed(caller, topic_id, subscribed)?)
}

#[update]
fn delete_topic(topic_id: TopicId) -> Result<Topic, String> {
    let caller = require_authenticated()?;
    let topic = forum::api::delete_topic(caller, topic_id)?;

    ic_cdk::println!("Deleted topic {} with {} post(s)", topic.id, topic.post_ids.len());
    Ok(topic)
}

// =============================================================================
// Submission API
// =============================================================================

#[update]
fn create_assessment(args: CreateAssessmentArgs) -> Result<Assessment, String> {
    let caller = require_authenticated()?;
    let assessment = submission::api::create_assessment(caller, args, ic_cdk::api::time())?;

    ic_cdk::println!("Created assessment {} in course {}", assessment.id, assessment.course_id);
    Ok(assessment)
}

#[query]
fn get_assessment(assessment_id: AssessmentId) -> Result<Assessment, String> {
    Ok(submission::api::get_assessment(ic_cdk::caller(), assessment_id)?)
}

#[update]
fn start_submission(assessment_id: AssessmentId) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    Ok(submission::api::start_submission(caller, assessment_id, ic_cdk::api::time())?)
}

#[query]
fn get_submission(submission_id: SubmissionId) -> Result<Submission, String> {
    Ok(submission::api::get_submission(ic_cdk::caller(), submission_id)?)
}

#[query]
fn get_allowed_actions(submission_id: SubmissionId) -> Result<Vec<SubmissionAction>, String> {
    Ok(submission::api::get_allowed_actions(ic_cdk::caller(), submission_id)?)
}

/// Gate a workflow state named by the client. Unknown states deny
/// everything.
#[query]
fn preview_allowed_actions(
    workflow_state: String,
    permissions: SubmissionPermissions,
) -> Vec<SubmissionAction> {
    submission::gate::actions_or_deny(&workflow_state, &permissions)
        .into_iter()
        .collect()
}

#[update]
fn submit_submission(submission_id: SubmissionId) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    Ok(submission::api::submit_submission(caller, submission_id, ic_cdk::api::time())?)
}

#[update]
fn unsubmit_submission(submission_id: SubmissionId) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    let submission = submission::api::unsubmit_submission(caller, submission_id)?;

    ic_cdk::println!("Submission {} unsubmitted by {}", submission.id, caller);
    Ok(submission)
}

#[update]
fn grade_submission(submission_id: SubmissionId, grade: f64) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    Ok(submission::api::grade_submission(caller, submission_id, grade, ic_cdk::api::time())?)
}

#[update]
fn delete_submission(submission_id: SubmissionId) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    let submission = submission::api::delete_submission(caller, submission_id)?;

    ic_cdk::println!("Submission {} deleted by {}", submission.id, caller);
    Ok(submission)
}

#[update]
fn record_access(submission_id: SubmissionId) -> Result<u64, String> {
    let caller = require_authenticated()?;
    Ok(submission::api::record_access(caller, submission_id, ic_cdk::api::time())?)
}

#[query]
fn get_access_logs(submission_id: SubmissionId) -> Result<Vec<AccessLog>, String> {
    Ok(submission::api::get_access_logs(ic_cdk::caller(), submission_id)?)
}

#[query]
fn list_submission_rows(
    assessment_id: AssessmentId,
    busy: Option<bool>,
) -> Result<Vec<SubmissionRow>, String> {
    Ok(submission::api::list_submission_rows(
        ic_cdk::caller(),
        assessment_id,
        busy.unwrap_or(false),
    )?)
}

// =============================================================================
// Forum Post Selection API
// =============================================================================

#[update]
fn open_post_selection(submission_id: SubmissionId) -> Result<SelectionView, String> {
    let caller = require_authenticated()?;
    Ok(selection::api::open_post_selection(caller, submission_id)?)
}

#[query]
fn get_post_selection(submission_id: SubmissionId) -> Result<SelectionView, String> {
    Ok(selection::api::get_post_selection(ic_cdk::caller(), submission_id)?)
}

#[update]
fn toggle_post_selection(
    submission_id: SubmissionId,
    post_id: PostId,
) -> Result<ToggleSelectionResponse, String> {
    let caller = require_authenticated()?;
    Ok(selection::api::toggle_post_selection(caller, submission_id, post_id)?)
}

#[update]
fn commit_post_selection(submission_id: SubmissionId) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    Ok(selection::api::commit_post_selection(caller, submission_id)?)
}

#[update]
fn discard_post_selection(submission_id: SubmissionId) -> Result<(), String> {
    let caller = require_authenticated()?;
    Ok(selection::api::discard_post_selection(caller, submission_id)?)
}

#[update]
fn remove_selected_post(submission_id: SubmissionId, post_id: PostId) -> Result<Submission, String> {
    let caller = require_authenticated()?;
    Ok(selection::api::remove_selected_post(caller, submission_id, post_id)?)
}

// =============================================================================
// Stats & Health
// =============================================================================

#[derive(candid::CandidType, serde::Serialize)]
pub struct Stats {
    pub total_courses: u64,
    pub total_course_users: u64,
    pub total_forums: u64,
    pub total_topics: u64,
    pub total_posts: u64,
    pub total_assessments: u64,
    pub total_submissions: u64,
}

#[query]
fn get_stats() -> Stats {
    let (total_courses, total_course_users) =
        state::with_state(|s| (s.courses.len() as u64, s.course_users.len() as u64));
    let (total_forums, total_topics, total_posts) = forum::state::with_forum_state(|s| {
        (s.forums.len() as u64, s.topics.len() as u64, s.posts.len() as u64)
    });
    let (total_assessments, total_submissions) = submission::state::with_submission_state(|s| {
        (s.assessments.len() as u64, s.submissions.len() as u64)
    });

    Stats {
        total_courses,
        total_course_users,
        total_forums,
        total_topics,
        total_posts,
        total_assessments,
        total_submissions,
    }
}

#[query]
fn health() -> String {
    "ok".to_string()
}

// Export candid interface
ic_cdk::export_candid!();
