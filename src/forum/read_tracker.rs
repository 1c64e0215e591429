//! Per-user read tracking for forum and video posts
//!
//! A post is unread for a user until a `ReadMark` exists for the
//! (user, post) pair. Marks are never updated once written, so marking is
//! idempotent and the first read time is kept.

use candid::Principal;

use super::state::ForumState;
use super::types::*;
use crate::types::{CourseId, Timestamp};

/// Mark posts as read for a user.
///
/// Posts that are already marked, or that do not exist, are skipped.
/// Returns the IDs that were newly marked, in input order.
pub fn mark_read(
    state: &mut ForumState,
    user: Principal,
    post_ids: &[PostId],
    now: Timestamp,
) -> Vec<PostId> {
    let mut newly_read = Vec::new();

    for &post_id in post_ids {
        if !state.posts.contains_key(&post_id) {
            continue;
        }
        if state.read_marks.contains_key(&(user, post_id)) {
            continue;
        }
        state.read_marks.insert(
            (user, post_id),
            ReadMark {
                user,
                post_id,
                read_at: now,
            },
        );
        newly_read.push(post_id);
    }

    newly_read
}

/// True iff the user has no read mark for the post
pub fn is_unread(state: &ForumState, user: &Principal, post_id: PostId) -> bool {
    !state.read_marks.contains_key(&(*user, post_id))
}

/// True iff any post of the topic is unread for the user
pub fn topic_unread_for_user(state: &ForumState, user: &Principal, topic_id: TopicId) -> bool {
    state
        .get_topic(topic_id)
        .map(|topic| {
            topic
                .post_ids
                .iter()
                .any(|&post_id| is_unread(state, user, post_id))
        })
        .unwrap_or(false)
}

/// Number of unread posts in a topic
pub fn unread_post_count(state: &ForumState, user: &Principal, topic_id: TopicId) -> u64 {
    state
        .get_topic(topic_id)
        .map(|topic| {
            topic
                .post_ids
                .iter()
                .filter(|&&post_id| is_unread(state, user, post_id))
                .count() as u64
        })
        .unwrap_or(0)
}

/// Topics of a course that still have unread posts for the user
pub fn unread_topic_ids(state: &ForumState, user: &Principal, course_id: CourseId) -> Vec<TopicId> {
    state
        .course_topics(course_id)
        .into_iter()
        .filter(|topic| topic_unread_for_user(state, user, topic.id))
        .map(|topic| topic.id)
        .collect()
}

/// Mark every post of a course as read. Returns how many marks were created.
pub fn mark_all_read(
    state: &mut ForumState,
    user: Principal,
    course_id: CourseId,
    now: Timestamp,
) -> u64 {
    let post_ids: Vec<PostId> = state
        .course_topics(course_id)
        .into_iter()
        .flat_map(|topic| topic.post_ids.iter().copied())
        .collect();

    mark_read(state, user, &post_ids, now).len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u8) -> Principal {
        Principal::from_slice(&[n; 10])
    }

    /// One course with a single forum topic holding `posts` posts
    fn state_with_topic(posts: u64) -> ForumState {
        let mut state = ForumState::new();
        let topic_id = state.next_topic_id();
        let mut post_ids = vec![];
        for _ in 0..posts {
            let id = state.next_post_id();
            state.posts.insert(
                id,
                Post {
                    id,
                    topic_id,
                    creator: user(9),
                    text: format!("post {}", id),
                    created_at: 1_000,
                },
            );
            post_ids.push(id);
        }
        state.topics.insert(
            topic_id,
            Topic {
                id: topic_id,
                course_id: 1,
                kind: TopicKind::Forum {
                    forum_id: 1,
                    title: "Week 1".to_string(),
                },
                post_ids,
                creator: user(9),
                locked: false,
                hidden: false,
                created_at: 1_000,
            },
        );
        state.course_topics.insert(1, vec![topic_id]);
        state
    }

    #[test]
    fn test_posts_start_unread() {
        let state = state_with_topic(2);
        assert!(is_unread(&state, &user(1), 1));
        assert!(is_unread(&state, &user(1), 2));
        assert!(topic_unread_for_user(&state, &user(1), 1));
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let mut state = state_with_topic(1);

        let first = mark_read(&mut state, user(1), &[1], 10);
        assert_eq!(first, vec![1]);
        assert!(!is_unread(&state, &user(1), 1));

        let second = mark_read(&mut state, user(1), &[1], 20);
        assert!(second.is_empty());
        assert!(!is_unread(&state, &user(1), 1));

        // First read time is kept
        assert_eq!(state.read_marks[&(user(1), 1)].read_at, 10);
        assert_eq!(state.read_marks.len(), 1);
    }

    #[test]
    fn test_mark_read_empty_input() {
        let mut state = state_with_topic(1);
        assert!(mark_read(&mut state, user(1), &[], 10).is_empty());
        assert!(state.read_marks.is_empty());
    }

    #[test]
    fn test_mark_read_skips_unknown_posts() {
        let mut state = state_with_topic(1);
        assert!(mark_read(&mut state, user(1), &[42], 10).is_empty());
        assert!(state.read_marks.is_empty());
    }

    #[test]
    fn test_read_marks_are_per_user() {
        let mut state = state_with_topic(1);
        mark_read(&mut state, user(1), &[1], 10);

        assert!(!is_unread(&state, &user(1), 1));
        assert!(is_unread(&state, &user(2), 1));
    }

    #[test]
    fn test_topic_read_once_all_posts_read() {
        let mut state = state_with_topic(3);

        mark_read(&mut state, user(1), &[1, 2], 10);
        assert!(topic_unread_for_user(&state, &user(1), 1));
        assert_eq!(unread_post_count(&state, &user(1), 1), 1);

        mark_read(&mut state, user(1), &[3], 20);
        assert!(!topic_unread_for_user(&state, &user(1), 1));
        assert_eq!(unread_post_count(&state, &user(1), 1), 0);
    }

    #[test]
    fn test_unknown_topic_is_not_unread() {
        let state = state_with_topic(1);
        assert!(!topic_unread_for_user(&state, &user(1), 99));
    }

    #[test]
    fn test_mark_all_read_clears_course() {
        let mut state = state_with_topic(4);
        mark_read(&mut state, user(1), &[2], 10);

        assert_eq!(unread_topic_ids(&state, &user(1), 1), vec![1]);
        assert_eq!(mark_all_read(&mut state, user(1), 1, 20), 3);
        assert!(unread_topic_ids(&state, &user(1), 1).is_empty());
    }

    #[test]
    fn test_remove_topic_drops_read_marks() {
        let mut state = state_with_topic(2);
        mark_read(&mut state, user(1), &[1, 2], 10);

        assert!(state.remove_topic(1).is_some());
        assert!(state.posts.is_empty());
        assert!(state.read_marks.is_empty());
        assert!(state.course_topics(1).is_empty());
    }
}
