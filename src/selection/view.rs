//! Projection of a selection buffer onto the user's forum posts

use candid::Principal;
use std::collections::BTreeSet;

use super::buffer::SelectionBuffer;
use super::types::*;
use crate::authorization::can_view_topic;
use crate::forum::state::ForumState;
use crate::forum::{Post, PostId, Topic};
use crate::submission::SubmissionId;
use crate::types::{CourseId, CourseRole};

/// Resolve a post the user may attach to a submission of `course_id`.
///
/// Only the user's own posts in visible forum topics of the course qualify.
pub fn candidate(
    state: &ForumState,
    course_id: CourseId,
    user: &Principal,
    role: CourseRole,
    post_id: PostId,
) -> Option<PostRef> {
    let post = state.get_post(post_id)?;
    if post.creator != *user {
        return None;
    }
    let topic = state.get_topic(post.topic_id)?;
    if topic.course_id != course_id || !can_view_topic(role, topic) {
        return None;
    }
    Some(PostRef {
        post_id,
        topic_id: topic.id,
        forum_id: topic.forum_id()?,
    })
}

fn topic_group(
    state: &ForumState,
    topic: &Topic,
    user: &Principal,
    buffer: &SelectionBuffer,
) -> Option<TopicPostGroup> {
    let forum_id = topic.forum_id()?;
    let posts: Vec<&Post> = topic
        .post_ids
        .iter()
        .filter_map(|id| state.get_post(*id))
        .filter(|post| post.creator == *user)
        .collect();
    if posts.is_empty() {
        return None;
    }

    let refs: Vec<PostRef> = posts
        .iter()
        .map(|post| PostRef {
            post_id: post.id,
            topic_id: topic.id,
            forum_id,
        })
        .collect();

    Some(TopicPostGroup {
        topic_id: topic.id,
        title: topic.title().unwrap_or_default().to_string(),
        posts: buffer
            .entries(&refs)
            .into_iter()
            .zip(posts)
            .map(|(entry, post)| SelectablePost {
                post: post.clone(),
                included: entry.included,
            })
            .collect(),
    })
}

/// The user's posts grouped forum by forum, then topic by topic.
/// Forums and topics without any of the user's posts are left out.
pub fn forum_groups(
    state: &ForumState,
    course_id: CourseId,
    user: &Principal,
    role: CourseRole,
    buffer: &SelectionBuffer,
) -> Vec<ForumPostGroup> {
    let initial: BTreeSet<PostId> = buffer.initial().iter().map(|e| e.post_id).collect();

    state
        .forums
        .values()
        .filter(|forum| forum.course_id == course_id)
        .filter_map(|forum| {
            let topics: Vec<TopicPostGroup> = state
                .forum_topics(forum.id)
                .into_iter()
                .filter(|topic| can_view_topic(role, topic))
                .filter_map(|topic| topic_group(state, topic, user, buffer))
                .collect();
            if topics.is_empty() {
                return None;
            }

            let expanded_on_load = topics
                .iter()
                .flat_map(|t| t.posts.iter())
                .any(|p| initial.contains(&p.post.id));

            Some(ForumPostGroup {
                forum_id: forum.id,
                forum_name: forum.name.clone(),
                topics,
                expanded_on_load,
            })
        })
        .collect()
}

pub fn build_view(
    submission_id: SubmissionId,
    buffer: &SelectionBuffer,
    forums: Vec<ForumPostGroup>,
) -> SelectionView {
    SelectionView {
        submission_id,
        status: buffer.status(),
        selected: buffer.selected().to_vec(),
        selected_count: buffer.selected().len() as u32,
        max_posts: buffer.max() as u32,
        confirm_enabled: buffer.status() == SelectionStatus::Open
            && buffer.has_changes(buffer.initial()),
        forums,
    }
}
