//! State management for the Forum module

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use super::types::*;
use crate::types::CourseId;

/// State structure for forums, topics, posts and read marks
#[derive(Default)]
pub struct ForumState {
    /// All forums by ID
    pub forums: BTreeMap<ForumId, Forum>,
    /// All topics by ID
    pub topics: BTreeMap<TopicId, Topic>,
    /// All posts by ID
    pub posts: BTreeMap<PostId, Post>,
    /// (User, Post) -> ReadMark, unique per pair
    pub read_marks: BTreeMap<(Principal, PostId), ReadMark>,
    /// Topic ID -> subscribed principals
    pub subscriptions: BTreeMap<TopicId, BTreeSet<Principal>>,
    /// Course ID -> Topic IDs (ordered by creation)
    pub course_topics: BTreeMap<CourseId, Vec<TopicId>>,
    pub next_forum_id: ForumId,
    pub next_topic_id: TopicId,
    pub next_post_id: PostId,
}

impl ForumState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self {
            forums: BTreeMap::new(),
            topics: BTreeMap::new(),
            posts: BTreeMap::new(),
            read_marks: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            course_topics: BTreeMap::new(),
            next_forum_id: 1,
            next_topic_id: 1,
            next_post_id: 1,
        }
    }

    pub fn next_forum_id(&mut self) -> ForumId {
        let id = self.next_forum_id;
        self.next_forum_id += 1;
        id
    }

    pub fn next_topic_id(&mut self) -> TopicId {
        let id = self.next_topic_id;
        self.next_topic_id += 1;
        id
    }

    pub fn next_post_id(&mut self) -> PostId {
        let id = self.next_post_id;
        self.next_post_id += 1;
        id
    }

    pub fn get_forum(&self, id: ForumId) -> Option<&Forum> {
        self.forums.get(&id)
    }

    pub fn get_topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(&id)
    }

    pub fn get_topic_mut(&mut self, id: TopicId) -> Option<&mut Topic> {
        self.topics.get_mut(&id)
    }

    pub fn get_post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id)
    }

    /// Get one page of a topic's posts
    pub fn get_topic_posts(&self, topic_id: TopicId, offset: u64, limit: u64) -> Vec<Post> {
        self.topics
            .get(&topic_id)
            .map(|topic| {
                topic
                    .post_ids
                    .iter()
                    .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                    .take(usize::try_from(limit).unwrap_or(usize::MAX))
                    .filter_map(|id| self.posts.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Topics of a course in creation order
    pub fn course_topics(&self, course_id: CourseId) -> Vec<&Topic> {
        self.course_topics
            .get(&course_id)
            .map(|ids| ids.iter().filter_map(|id| self.topics.get(id)).collect())
            .unwrap_or_default()
    }

    /// Forum topics belonging to a forum
    pub fn forum_topics(&self, forum_id: ForumId) -> Vec<&Topic> {
        let course_id = match self.forums.get(&forum_id) {
            Some(forum) => forum.course_id,
            None => return vec![],
        };
        self.course_topics(course_id)
            .into_iter()
            .filter(|t| t.forum_id() == Some(forum_id))
            .collect()
    }

    /// Topics of a course in which the user has posted
    pub fn topics_from_user(&self, course_id: CourseId, user: &Principal) -> Vec<TopicId> {
        self.course_topics(course_id)
            .into_iter()
            .filter(|topic| {
                topic
                    .post_ids
                    .iter()
                    .filter_map(|id| self.posts.get(id))
                    .any(|post| post.creator == *user)
            })
            .map(|topic| topic.id)
            .collect()
    }

    pub fn is_subscribed(&self, topic_id: TopicId, user: &Principal) -> bool {
        self.subscriptions
            .get(&topic_id)
            .map(|set| set.contains(user))
            .unwrap_or(false)
    }

    /// Remove a topic together with its posts, read marks and subscriptions
    pub fn remove_topic(&mut self, topic_id: TopicId) -> Option<Topic> {
        let topic = self.topics.remove(&topic_id)?;

        let post_ids: BTreeSet<PostId> = topic.post_ids.iter().copied().collect();
        for post_id in &post_ids {
            self.posts.remove(post_id);
        }
        self.read_marks
            .retain(|(_, post_id), _| !post_ids.contains(post_id));
        self.subscriptions.remove(&topic_id);

        if let Some(ids) = self.course_topics.get_mut(&topic.course_id) {
            ids.retain(|&id| id != topic_id);
        }

        Some(topic)
    }
}

thread_local! {
    pub static FORUM_STATE: RefCell<ForumState> = RefCell::new(ForumState::new());
}

/// Helper function to access forum state
pub fn with_forum_state<F, R>(f: F) -> R
where
    F: FnOnce(&ForumState) -> R,
{
    FORUM_STATE.with(|state| f(&state.borrow()))
}

/// Helper function to mutably access forum state
pub fn with_forum_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut ForumState) -> R,
{
    FORUM_STATE.with(|state| f(&mut state.borrow_mut()))
}

// =============================================================================
// Stable Storage Types
// =============================================================================

/// Serializable state for canister upgrades
#[derive(CandidType, Deserialize, Serialize, Clone, Default)]
pub struct StableForumState {
    pub forums: Vec<(ForumId, Forum)>,
    pub topics: Vec<(TopicId, Topic)>,
    pub posts: Vec<(PostId, Post)>,
    pub read_marks: Vec<ReadMark>,
    pub subscriptions: Vec<(TopicId, Vec<Principal>)>,
    pub course_topics: Vec<(CourseId, Vec<TopicId>)>,
    pub next_forum_id: ForumId,
    pub next_topic_id: TopicId,
    pub next_post_id: PostId,
}

impl From<&ForumState> for StableForumState {
    fn from(state: &ForumState) -> Self {
        StableForumState {
            forums: state.forums.iter().map(|(k, v)| (*k, v.clone())).collect(),
            topics: state.topics.iter().map(|(k, v)| (*k, v.clone())).collect(),
            posts: state.posts.iter().map(|(k, v)| (*k, v.clone())).collect(),
            read_marks: state.read_marks.values().cloned().collect(),
            subscriptions: state
                .subscriptions
                .iter()
                .map(|(k, v)| (*k, v.iter().cloned().collect()))
                .collect(),
            course_topics: state
                .course_topics
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            next_forum_id: state.next_forum_id,
            next_topic_id: state.next_topic_id,
            next_post_id: state.next_post_id,
        }
    }
}

impl From<StableForumState> for ForumState {
    fn from(stable: StableForumState) -> Self {
        ForumState {
            forums: stable.forums.into_iter().collect(),
            topics: stable.topics.into_iter().collect(),
            posts: stable.posts.into_iter().collect(),
            read_marks: stable
                .read_marks
                .into_iter()
                .map(|mark| ((mark.user, mark.post_id), mark))
                .collect(),
            subscriptions: stable
                .subscriptions
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
            course_topics: stable.course_topics.into_iter().collect(),
            next_forum_id: stable.next_forum_id,
            next_topic_id: stable.next_topic_id,
            next_post_id: stable.next_post_id,
        }
    }
}
