//! API functions for the Forum module
//!
//! Business logic behind the forum endpoints in lib.rs. Every function takes
//! the authenticated caller and the current time so it can run outside of a
//! canister call context.

use candid::Principal;

use super::read_tracker;
use super::state::{with_forum_state, with_forum_state_mut};
use super::types::*;
use super::validation::{validate_create_topic, validate_post_text, validate_title};
use crate::authorization::{can_reply, can_view_topic, require_enrolled, require_manager, require_staff};
use crate::error::{CourseError, Result};
use crate::state::with_state;
use crate::types::{CanisterConfig, CourseId, CourseRole, Timestamp};

fn caller_role(course_id: CourseId, caller: &Principal) -> Option<CourseRole> {
    with_state(|state| state.course_role(course_id, caller))
}

fn config() -> CanisterConfig {
    with_state(|state| state.config.clone())
}

/// Look up a topic and the caller's role in its course, enforcing visibility
fn visible_topic(caller: &Principal, topic_id: TopicId) -> Result<(Topic, CourseRole)> {
    let topic = with_forum_state(|state| state.get_topic(topic_id).cloned())
        .ok_or(CourseError::NotFound("Topic"))?;
    let role = require_enrolled(caller_role(topic.course_id, caller))?;
    if !can_view_topic(role, &topic) {
        // Hidden topics look absent to students
        return Err(CourseError::NotFound("Topic"));
    }
    Ok((topic, role))
}

// =============================================================================
// Forum Operations
// =============================================================================

/// Create a forum in a course (managers only)
pub fn create_forum(caller: Principal, args: CreateForumArgs, now: Timestamp) -> Result<Forum> {
    if with_state(|state| state.get_course(args.course_id).is_none()) {
        return Err(CourseError::NotFound("Course"));
    }
    require_manager(caller_role(args.course_id, &caller))?;
    validate_title(&args.name, &config())?;

    Ok(with_forum_state_mut(|state| {
        let id = state.next_forum_id();
        let forum = Forum {
            id,
            course_id: args.course_id,
            name: args.name,
            description: args.description,
            created_at: now,
        };
        state.forums.insert(id, forum.clone());
        forum
    }))
}

/// List the forums of a course
pub fn list_forums(caller: Principal, course_id: CourseId) -> Result<Vec<Forum>> {
    require_enrolled(caller_role(course_id, &caller))?;
    Ok(with_forum_state(|state| {
        state
            .forums
            .values()
            .filter(|f| f.course_id == course_id)
            .cloned()
            .collect()
    }))
}

// =============================================================================
// Topic Operations
// =============================================================================

/// Start a topic. The text becomes the first post; the creator is
/// subscribed and has already read it.
pub fn create_topic(caller: Principal, args: CreateTopicArgs, now: Timestamp) -> Result<Topic> {
    require_enrolled(caller_role(args.course_id, &caller))?;
    validate_create_topic(&args, &config())?;

    with_forum_state_mut(|state| {
        if let TopicKind::Forum { forum_id, .. } = &args.kind {
            let forum = state
                .get_forum(*forum_id)
                .ok_or(CourseError::NotFound("Forum"))?;
            if forum.course_id != args.course_id {
                return Err(CourseError::NotFound("Forum"));
            }
        }

        let topic_id = state.next_topic_id();
        let post_id = state.next_post_id();

        state.posts.insert(
            post_id,
            Post {
                id: post_id,
                topic_id,
                creator: caller,
                text: args.text,
                created_at: now,
            },
        );

        let topic = Topic {
            id: topic_id,
            course_id: args.course_id,
            kind: args.kind,
            post_ids: vec![post_id],
            creator: caller,
            locked: false,
            hidden: false,
            created_at: now,
        };
        state.topics.insert(topic_id, topic.clone());
        state
            .course_topics
            .entry(args.course_id)
            .or_default()
            .push(topic_id);
        state.subscriptions.entry(topic_id).or_default().insert(caller);
        read_tracker::mark_read(state, caller, &[post_id], now);

        Ok(topic)
    })
}

/// Reply to a topic
pub fn create_post(caller: Principal, args: CreatePostArgs, now: Timestamp) -> Result<Post> {
    let (topic, role) = visible_topic(&caller, args.topic_id)?;
    if !can_reply(role, &topic) {
        return Err(CourseError::Validation("This topic is locked".to_string()));
    }
    validate_post_text(&args.text, &config())?;

    with_forum_state_mut(|state| {
        let post_id = state.next_post_id();
        let post = Post {
            id: post_id,
            topic_id: args.topic_id,
            creator: caller,
            text: args.text,
            created_at: now,
        };

        let topic = state
            .get_topic_mut(args.topic_id)
            .ok_or(CourseError::NotFound("Topic"))?;
        topic.post_ids.push(post_id);
        state.posts.insert(post_id, post.clone());
        read_tracker::mark_read(state, caller, &[post_id], now);

        Ok(post)
    })
}

/// Show one page of a topic and mark every post on the page as read.
///
/// The read marks for the page are written in a single `mark_read` call,
/// so one view marks each loaded post exactly once.
pub fn show_topic(
    caller: Principal,
    topic_id: TopicId,
    offset: Option<u64>,
    now: Timestamp,
) -> Result<TopicView> {
    let (topic, _) = visible_topic(&caller, topic_id)?;
    let offset = offset.unwrap_or(0);
    let limit = config().topic_page_size;

    Ok(with_forum_state_mut(|state| {
        let posts = state.get_topic_posts(topic_id, offset, limit);
        let loaded: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        let newly_read = read_tracker::mark_read(state, caller, &loaded, now);

        TopicView {
            total_posts: topic.post_ids.len() as u64,
            topic,
            posts,
            newly_read,
            offset,
        }
    }))
}

/// List the topics of a forum with the caller's unread and subscription flags
pub fn list_topics(caller: Principal, forum_id: ForumId) -> Result<Vec<TopicSummary>> {
    let course_id = with_forum_state(|state| state.get_forum(forum_id).map(|f| f.course_id))
        .ok_or(CourseError::NotFound("Forum"))?;
    let role = require_enrolled(caller_role(course_id, &caller))?;

    Ok(with_forum_state(|state| {
        state
            .forum_topics(forum_id)
            .into_iter()
            .filter(|topic| can_view_topic(role, topic))
            .map(|topic| TopicSummary {
                post_count: topic.post_ids.len() as u64,
                unread: read_tracker::topic_unread_for_user(state, &caller, topic.id),
                unread_posts: read_tracker::unread_post_count(state, &caller, topic.id),
                subscribed: state.is_subscribed(topic.id, &caller),
                topic: topic.clone(),
            })
            .collect()
    }))
}

/// Topics of a course with unread posts for the caller
pub fn unread_topics(caller: Principal, course_id: CourseId) -> Result<Vec<TopicId>> {
    let role = require_enrolled(caller_role(course_id, &caller))?;

    Ok(with_forum_state(|state| {
        read_tracker::unread_topic_ids(state, &caller, course_id)
            .into_iter()
            .filter(|id| {
                state
                    .get_topic(*id)
                    .map(|topic| can_view_topic(role, topic))
                    .unwrap_or(false)
            })
            .collect()
    }))
}

/// Whether a single post is unread for the caller
pub fn is_post_unread(caller: Principal, post_id: PostId) -> Result<bool> {
    let topic_id = with_forum_state(|state| state.get_post(post_id).map(|p| p.topic_id))
        .ok_or(CourseError::NotFound("Post"))?;
    visible_topic(&caller, topic_id)?;
    Ok(with_forum_state(|state| read_tracker::is_unread(state, &caller, post_id)))
}

/// Mark every post of a course as read for the caller
pub fn mark_all_read(caller: Principal, course_id: CourseId, now: Timestamp) -> Result<u64> {
    require_enrolled(caller_role(course_id, &caller))?;
    Ok(with_forum_state_mut(|state| {
        read_tracker::mark_all_read(state, caller, course_id, now)
    }))
}

/// Topics of a course the caller has posted in
pub fn topics_from_user(caller: Principal, course_id: CourseId) -> Result<Vec<TopicId>> {
    require_enrolled(caller_role(course_id, &caller))?;
    Ok(with_forum_state(|state| state.topics_from_user(course_id, &caller)))
}

// =============================================================================
// Moderation Operations
// =============================================================================

/// Lock or unlock a topic (staff only)
pub fn set_locked(caller: Principal, topic_id: TopicId, locked: bool) -> Result<()> {
    let (topic, role) = visible_topic(&caller, topic_id)?;
    require_staff(Some(role))?;

    with_forum_state_mut(|state| {
        let topic = state
            .get_topic_mut(topic.id)
            .ok_or(CourseError::NotFound("Topic"))?;
        topic.locked = locked;
        Ok(())
    })
}

/// Hide or unhide a topic (staff only)
pub fn set_hidden(caller: Principal, topic_id: TopicId, hidden: bool) -> Result<()> {
    let (topic, role) = visible_topic(&caller, topic_id)?;
    require_staff(Some(role))?;

    with_forum_state_mut(|state| {
        let topic = state
            .get_topic_mut(topic.id)
            .ok_or(CourseError::NotFound("Topic"))?;
        topic.hidden = hidden;
        Ok(())
    })
}

/// Subscribe to or unsubscribe from a topic
pub fn set_subscribed(caller: Principal, topic_id: TopicId, subscribe: bool) -> Result<()> {
    visible_topic(&caller, topic_id)?;

    with_forum_state_mut(|state| {
        let subscribers = state.subscriptions.entry(topic_id).or_default();
        if subscribe {
            subscribers.insert(caller);
        } else {
            subscribers.remove(&caller);
        }
    });
    Ok(())
}

/// Delete a topic with all of its posts (staff or the topic creator)
pub fn delete_topic(caller: Principal, topic_id: TopicId) -> Result<Topic> {
    let (topic, role) = visible_topic(&caller, topic_id)?;
    if topic.creator != caller {
        require_staff(Some(role))?;
    }

    with_forum_state_mut(|state| state.remove_topic(topic_id))
        .ok_or(CourseError::NotFound("Topic"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::with_state_mut;
    use crate::types::{AddCourseUserRequest, CreateCourseRequest};

    fn principal(n: u8) -> Principal {
        Principal::from_slice(&[n; 10])
    }

    /// Course 1 owned by principal(1), with student principal(2) and a forum
    fn setup() -> ForumId {
        with_state_mut(|state| {
            state.create_course(
                principal(1),
                CreateCourseRequest {
                    title: "CS1010".to_string(),
                    owner_name: "Prof".to_string(),
                },
                0,
            );
            state.upsert_course_user(
                AddCourseUserRequest {
                    course_id: 1,
                    principal: principal(2),
                    name: "Student".to_string(),
                    role: None,
                    phantom: None,
                },
                0,
            );
        });
        create_forum(
            principal(1),
            CreateForumArgs {
                course_id: 1,
                name: "General".to_string(),
                description: None,
            },
            0,
        )
        .unwrap()
        .id
    }

    fn start_topic(forum_id: ForumId, author: Principal, title: &str) -> Topic {
        create_topic(
            author,
            CreateTopicArgs {
                course_id: 1,
                kind: TopicKind::Forum {
                    forum_id,
                    title: title.to_string(),
                },
                text: "First post".to_string(),
            },
            10,
        )
        .unwrap()
    }

    #[test]
    fn test_student_cannot_create_forum() {
        setup();
        let result = create_forum(
            principal(2),
            CreateForumArgs {
                course_id: 1,
                name: "Mine".to_string(),
                description: None,
            },
            0,
        );
        assert!(matches!(result, Err(CourseError::Unauthorized(_))));
    }

    #[test]
    fn test_creator_has_read_own_topic() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(1), "Welcome");

        let summaries = list_topics(principal(1), forum_id).unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(!summaries[0].unread);
        assert!(summaries[0].subscribed);

        let student_view = list_topics(principal(2), forum_id).unwrap();
        assert!(student_view[0].unread);
        assert_eq!(unread_topics(principal(2), 1).unwrap(), vec![topic.id]);
    }

    #[test]
    fn test_show_topic_marks_loaded_posts_read() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(1), "Welcome");
        create_post(
            principal(1),
            CreatePostArgs {
                topic_id: topic.id,
                text: "Second".to_string(),
            },
            20,
        )
        .unwrap();

        let view = show_topic(principal(2), topic.id, None, 30).unwrap();
        assert_eq!(view.posts.len(), 2);
        assert_eq!(view.newly_read, vec![1, 2]);
        assert!(unread_topics(principal(2), 1).unwrap().is_empty());

        // A second view finds nothing new
        let again = show_topic(principal(2), topic.id, None, 40).unwrap();
        assert!(again.newly_read.is_empty());
    }

    #[test]
    fn test_show_topic_only_marks_the_page() {
        let forum_id = setup();
        with_state_mut(|state| state.config.topic_page_size = 1);
        let topic = start_topic(forum_id, principal(1), "Paged");
        let reply = create_post(
            principal(1),
            CreatePostArgs {
                topic_id: topic.id,
                text: "Reply".to_string(),
            },
            20,
        )
        .unwrap();

        let view = show_topic(principal(2), topic.id, Some(0), 30).unwrap();
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.total_posts, 2);
        assert!(is_post_unread(principal(2), reply.id).unwrap());
    }

    #[test]
    fn test_show_topic_past_the_end_marks_nothing() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(1), "Paged");

        for offset in [1, 1u64 << 32, u64::MAX] {
            let view = show_topic(principal(2), topic.id, Some(offset), 30).unwrap();
            assert!(view.posts.is_empty());
            assert!(view.newly_read.is_empty());
            assert_eq!(view.offset, offset);
        }
        assert!(is_post_unread(principal(2), topic.post_ids[0]).unwrap());
    }

    #[test]
    fn test_locked_topic_rejects_student_reply() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(1), "Rules");
        set_locked(principal(1), topic.id, true).unwrap();

        let student = create_post(
            principal(2),
            CreatePostArgs {
                topic_id: topic.id,
                text: "Can I?".to_string(),
            },
            20,
        );
        assert!(student.is_err());

        let staff = create_post(
            principal(1),
            CreatePostArgs {
                topic_id: topic.id,
                text: "Staff note".to_string(),
            },
            20,
        );
        assert!(staff.is_ok());
    }

    #[test]
    fn test_hidden_topic_invisible_to_students() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(1), "Answers");
        set_hidden(principal(1), topic.id, true).unwrap();

        assert!(list_topics(principal(2), forum_id).unwrap().is_empty());
        assert_eq!(
            show_topic(principal(2), topic.id, None, 20).err(),
            Some(CourseError::NotFound("Topic"))
        );
        assert!(unread_topics(principal(2), 1).unwrap().is_empty());
    }

    #[test]
    fn test_student_cannot_lock() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(2), "Question");
        assert!(set_locked(principal(2), topic.id, true).is_err());
    }

    #[test]
    fn test_delete_topic_by_creator() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(2), "Oops");
        show_topic(principal(1), topic.id, None, 20).unwrap();

        assert!(delete_topic(principal(2), topic.id).is_ok());
        with_forum_state(|state| {
            assert!(state.topics.is_empty());
            assert!(state.posts.is_empty());
            assert!(state.read_marks.is_empty());
        });
    }

    #[test]
    fn test_topics_from_user() {
        let forum_id = setup();
        start_topic(forum_id, principal(1), "Staff topic");
        let mine = start_topic(forum_id, principal(2), "Student topic");

        assert_eq!(topics_from_user(principal(2), 1).unwrap(), vec![mine.id]);
    }

    #[test]
    fn test_unsubscribe() {
        let forum_id = setup();
        let topic = start_topic(forum_id, principal(1), "News");
        set_subscribed(principal(1), topic.id, false).unwrap();
        set_subscribed(principal(2), topic.id, true).unwrap();

        let staff = list_topics(principal(1), forum_id).unwrap();
        let student = list_topics(principal(2), forum_id).unwrap();
        assert!(!staff[0].subscribed);
        assert!(student[0].subscribed);
    }

    #[test]
    fn test_outsider_rejected() {
        let forum_id = setup();
        assert!(list_topics(principal(7), forum_id).is_err());
    }
}
